pub mod backend;
pub mod catalog;
pub mod domain;
pub mod error;
pub mod history;
pub mod job;
pub mod ledger;
pub mod poller;
pub mod ports;
pub mod profiles;

#[cfg(test)]
mod testing;

pub use backend::{AudioJobTicket, BackendClient};
pub use catalog::{HootPack, VoicePreset, HOOT_PACKS, VOICES};
pub use domain::{AcademicLevel, ContentFormat, GeneratedPodcast, GenerationRequest, Job, JobStatus, Profile, UserProfile};
pub use error::{FlowError, FlowResult};
pub use history::HistoryCache;
pub use job::{JobState, JobStateMachine, JobUpdate};
pub use ledger::BalanceLedger;
pub use poller::{CheckOutcome, PollEvent, PollFailure, PollPolicy, PollSubscription, Poller};
pub use ports::{CredentialProvider, PortError, PortResult, RemoteCaller};
pub use profiles::{parse_interests, ChildEdit, ProfileBook};
