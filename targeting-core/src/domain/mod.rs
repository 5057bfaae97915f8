pub mod delivery;
pub mod edge;
pub mod member;
pub mod pattern;
pub mod question;
pub mod taste;

pub use delivery::{Assignment, DeliveryChannel, DeliveryStatus, SelectionMethod, TargetingContext};
pub use edge::{canonical_pair, Edge, EdgeEvidence, EdgeType, MemberId};
pub use member::{lower_set, Member, MembershipStatus, ProfileField};
pub use pattern::{Pattern, PatternCategory, PatternEvidence};
pub use question::{AnswerForm, EdgeContext, Question, QuestionCategory, QuestionVibe};
pub use taste::{ContextState, EnergyLevel, TasteProfile, TasteUpdate};
