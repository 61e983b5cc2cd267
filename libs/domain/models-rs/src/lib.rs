// [libs/domain/models-rs/src/lib.rs]

pub mod subject;
pub mod method;
pub mod journal;
pub mod snapshot;
pub mod verifier;
pub mod command;

pub use subject::{SubjectClass, SubjectId};
pub use method::{VerificationLevel, VerificationMethod};
pub use journal::{EventDraft, EventKind, FailureReason, MethodCompletion, VerificationEvent};
pub use snapshot::{ProtocolRun, ProtocolState, SubjectSnapshot};
pub use verifier::{CredentialKind, VerifierRecord};
pub use command::{
    CancelMethodPayload, CommandRejection, CommunityAttestPayload, DeleteSubjectPayload,
    DenialReason, MethodStatusView, NextLevelView, RevokePayload, StartMethodPayload,
    StartMethodReceipt, SuggestedPath, VerifierConfirmPayload,
};
