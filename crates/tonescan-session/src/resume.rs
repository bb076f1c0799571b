//! Building a continuation run from what storage remembers.

use crate::error::Result;
use tonescan_numbers::{CountryProfile, DialOrder, PatternSpec, ResumeIndex};
use tonescan_storage::ResultSink;

/// Everything needed to continue an interrupted run.
#[derive(Debug)]
pub struct ResumePlan {
    /// Session id to continue under; `None` means mint a fresh id
    pub session_id: Option<String>,
    /// The pattern the remaining set was derived from
    pub pattern: PatternSpec,
    /// Candidates still to dial, in configured order
    pub numbers: Vec<String>,
    /// How many numbers the prior run covered
    pub already_dialed: usize,
}

impl ResumePlan {
    /// Whether the prior run already covered the whole space.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.numbers.is_empty()
    }
}

/// Derive a continuation plan from a sink's dialed-number history.
///
/// `prior_session` restricts the history to one session and becomes the
/// continuation id; `force_new_session` keeps the history restriction but
/// mints a fresh id. With no explicit prefix the pattern is inferred from
/// the dialed set.
///
/// # Errors
/// Storage read failures; inference failures when the dialed set is
/// empty or shares no usable prefix (supply `explicit_prefix` then).
pub async fn prepare_resume(
    sink: &dyn ResultSink,
    prior_session: Option<&str>,
    explicit_prefix: Option<&str>,
    force_new_session: bool,
    profile: &CountryProfile,
    order: DialOrder,
) -> Result<ResumePlan> {
    let dialed = sink.read_dialed_numbers(prior_session).await?;
    tracing::info!(
        "Resume: {} dialed numbers on record{}",
        dialed.len(),
        prior_session.map_or_else(String::new, |id| format!(" for session {id}"))
    );

    let index = ResumeIndex::build(&dialed, explicit_prefix, profile, order)?;
    let session_id = if force_new_session {
        None
    } else {
        prior_session.map(String::from)
    };

    Ok(ResumePlan {
        session_id,
        pattern: index.pattern().clone(),
        already_dialed: index.already_dialed(),
        numbers: index.into_remaining(),
    })
}
