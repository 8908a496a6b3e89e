// Trace attempt session
// Per-widget drawing state, single in-flight check, and stale-response guarding

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::judge::HandwritingJudge;
use crate::pipeline::two_stage::{TwoStageValidator, ValidationResult};
use crate::trace::{Point, Trace, ValidationError};

/// Lifecycle of one trace attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptState {
    /// Nothing drawn yet
    Idle,

    /// Strokes are being collected
    Drawing,

    /// Rejected locally; the judge was not consulted
    Done,

    /// Accepted locally; waiting on the judge
    Checking,

    /// Accepted, by the judge or because it was unavailable
    Confirmed,

    /// Locally accepted but the judge said it is not the letter
    JudgeRejected,
}

/// Generation counter identifying one version of the trace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttemptId(pub u64);

/// Snapshot handed to the judge stage
#[derive(Debug, Clone)]
pub struct PendingCheck {
    pub attempt: AttemptId,
    pub letter: char,
    pub canvas_size: f32,
    pub trace: Trace,
}

/// Result of starting a check
#[derive(Debug, Clone)]
pub enum Submission {
    /// No judge call needed; result is final
    Finished(ValidationResult),

    /// Locally accepted; run the judge then `resolve`
    Pending(PendingCheck),
}

/// Drawing state for one trace widget
#[derive(Debug, Clone)]
pub struct TraceSession {
    letter: char,
    canvas_size: f32,
    trace: Trace,
    state: AttemptState,
    attempt: u64,
    pen_down: bool,
    is_checking: bool,
    feedback: Option<String>,
    last_result: Option<ValidationResult>,
}

impl TraceSession {
    pub fn new(letter: char, canvas_size: f32) -> Self {
        TraceSession {
            letter,
            canvas_size,
            trace: Trace::new(),
            state: AttemptState::Idle,
            attempt: 0,
            pen_down: false,
            is_checking: false,
            feedback: None,
            last_result: None,
        }
    }

    pub fn letter(&self) -> char {
        self.letter
    }

    pub fn canvas_size(&self) -> f32 {
        self.canvas_size
    }

    pub fn trace(&self) -> &Trace {
        &self.trace
    }

    pub fn state(&self) -> AttemptState {
        self.state
    }

    pub fn attempt(&self) -> AttemptId {
        AttemptId(self.attempt)
    }

    pub fn is_checking(&self) -> bool {
        self.is_checking
    }

    pub fn feedback(&self) -> Option<&str> {
        self.feedback.as_deref()
    }

    pub fn last_result(&self) -> Option<&ValidationResult> {
        self.last_result.as_ref()
    }

    /// Start a stroke
    /// Drawing on a submitted trace continues it as a new attempt
    pub fn pen_down(&mut self, point: Point) {
        if matches!(
            self.state,
            AttemptState::Done
                | AttemptState::Checking
                | AttemptState::Confirmed
                | AttemptState::JudgeRejected
        ) {
            self.next_attempt();
        }

        self.trace.break_stroke();
        self.trace.push_point(point);
        self.pen_down = true;
        self.state = AttemptState::Drawing;
    }

    /// Extend the current stroke; ignored while the pen is up
    pub fn pen_move(&mut self, point: Point) {
        if self.pen_down && self.state == AttemptState::Drawing {
            self.trace.push_point(point);
        }
    }

    pub fn pen_up(&mut self) {
        self.pen_down = false;
        self.trace.break_stroke();
    }

    /// Wipe the canvas and start over
    pub fn clear(&mut self) {
        self.trace.clear();
        self.next_attempt();
        self.pen_down = false;
        self.state = AttemptState::Idle;
    }

    /// Run the local check and decide whether the judge is needed
    pub fn begin_check<J>(
        &mut self,
        validator: &TwoStageValidator<J>,
    ) -> Result<Submission, ValidationError> {
        if self.is_checking {
            return Err(ValidationError::CheckInFlight);
        }

        let accepted = validator.check_local(&self.trace, self.letter, self.canvas_size)?;
        self.pen_up();

        if !accepted {
            let result = ValidationResult::rejected();
            self.finish(AttemptState::Done, result.clone());
            return Ok(Submission::Finished(result));
        }

        if !validator.has_judge() {
            let result = ValidationResult::local_only();
            self.finish(AttemptState::Confirmed, result.clone());
            return Ok(Submission::Finished(result));
        }

        self.state = AttemptState::Checking;
        self.is_checking = true;
        log::debug!(
            "Attempt {} for '{}' accepted locally, checking with judge",
            self.attempt,
            self.letter
        );

        Ok(Submission::Pending(PendingCheck {
            attempt: self.attempt(),
            letter: self.letter,
            canvas_size: self.canvas_size,
            trace: self.trace.clone(),
        }))
    }

    /// Apply a judge-stage result
    /// Returns false when the trace changed since the check started
    pub fn resolve(&mut self, attempt: AttemptId, result: ValidationResult) -> bool {
        if attempt != self.attempt() || !self.is_checking {
            log::debug!(
                "Discarding stale result for attempt {} (current {})",
                attempt.0,
                self.attempt
            );
            return false;
        }

        let state = if result.accepted {
            AttemptState::Confirmed
        } else {
            AttemptState::JudgeRejected
        };
        self.finish(state, result);
        true
    }

    fn finish(&mut self, state: AttemptState, result: ValidationResult) {
        log::info!(
            "Attempt {} for '{}': accepted={} ({})",
            self.attempt,
            self.letter,
            result.accepted,
            result.resolution.as_str()
        );

        self.state = state;
        self.is_checking = false;
        self.feedback = result.feedback.clone();
        self.last_result = Some(result);
    }

    fn next_attempt(&mut self) {
        self.attempt += 1;
        self.is_checking = false;
        self.feedback = None;
        self.last_result = None;
    }
}

/// Shared handle to a session plus the validator that checks it
///
/// Input handlers and the submit task hold clones. The session lock is
/// never held across the judge call.
pub struct TracePad<J> {
    session: Arc<Mutex<TraceSession>>,
    validator: Arc<TwoStageValidator<J>>,
}

impl<J> Clone for TracePad<J> {
    fn clone(&self) -> Self {
        TracePad {
            session: Arc::clone(&self.session),
            validator: Arc::clone(&self.validator),
        }
    }
}

impl<J: HandwritingJudge> TracePad<J> {
    pub fn new(letter: char, canvas_size: f32, validator: Arc<TwoStageValidator<J>>) -> Self {
        TracePad {
            session: Arc::new(Mutex::new(TraceSession::new(letter, canvas_size))),
            validator,
        }
    }

    fn lock(&self) -> MutexGuard<'_, TraceSession> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run a closure against the session (pointer input, clearing, reading state)
    pub fn with_session<R>(&self, f: impl FnOnce(&mut TraceSession) -> R) -> R {
        f(&mut self.lock())
    }

    /// Validate the current trace
    ///
    /// Returns `Ok(None)` if the trace was cleared or redrawn while the
    /// judge was running; the stale result is dropped.
    pub async fn submit(&self) -> Result<Option<ValidationResult>, ValidationError> {
        let submission = {
            let mut session = self.lock();
            session.begin_check(self.validator.as_ref())?
        };

        let pending = match submission {
            Submission::Finished(result) => return Ok(Some(result)),
            Submission::Pending(pending) => pending,
        };

        let result = self
            .validator
            .confirm(&pending.trace, pending.letter, pending.canvas_size)
            .await;

        let mut session = self.lock();
        if session.resolve(pending.attempt, result.clone()) {
            Ok(Some(result))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::judge::{JudgeError, JudgeVerdict};
    use crate::pipeline::two_stage::tests::{vertical_l, Behavior, CountingJudge};
    use crate::pipeline::two_stage::Resolution;
    use crate::render::TraceImage;
    use crate::trace::{ShapeLibrary, WaypointValidator};
    use tokio::sync::Notify;

    fn local_validator() -> TwoStageValidator<crate::pipeline::two_stage::NoJudge> {
        TwoStageValidator::local_only(ShapeLibrary::builtin(), WaypointValidator::new())
    }

    fn judged_validator(behavior: Behavior) -> TwoStageValidator<CountingJudge> {
        TwoStageValidator::new(
            ShapeLibrary::builtin(),
            WaypointValidator::new(),
            Some(CountingJudge::new(behavior)),
        )
    }

    fn draw(session: &mut TraceSession, trace: &Trace) {
        for stroke in trace.strokes() {
            session.pen_down(stroke[0]);
            for p in &stroke[1..] {
                session.pen_move(*p);
            }
            session.pen_up();
        }
    }

    /// Judge that blocks until released
    struct GatedJudge {
        entered: Notify,
        release: Notify,
    }

    impl HandwritingJudge for GatedJudge {
        async fn evaluate(&self, _image: &TraceImage, _letter: char) -> Result<JudgeVerdict, JudgeError> {
            self.entered.notify_one();
            self.release.notified().await;
            Ok(JudgeVerdict {
                valid: true,
                feedback: Some("Well done".to_string()),
            })
        }
    }

    #[test]
    fn test_drawing_states() {
        let mut session = TraceSession::new('l', 200.0);
        assert_eq!(session.state(), AttemptState::Idle);

        session.pen_move(Point::new(1.0, 1.0));
        assert!(session.trace().is_empty());

        session.pen_down(Point::new(100.0, 20.0));
        session.pen_move(Point::new(100.0, 30.0));
        assert_eq!(session.state(), AttemptState::Drawing);

        session.pen_up();
        session.pen_move(Point::new(5.0, 5.0));
        assert_eq!(session.trace().point_count(), 2);
    }

    #[test]
    fn test_local_accept_without_judge_confirms() {
        let validator = local_validator();
        let mut session = TraceSession::new('l', 200.0);
        draw(&mut session, &vertical_l());

        let submission = session.begin_check(&validator).unwrap();
        assert!(matches!(submission, Submission::Finished(ref r) if r.accepted));
        assert_eq!(session.state(), AttemptState::Confirmed);
        assert!(!session.is_checking());
    }

    #[test]
    fn test_reject_leaves_trace_editable() {
        let validator = local_validator();
        let mut session = TraceSession::new('l', 200.0);

        session.pen_down(Point::new(100.0, 20.0));
        session.pen_move(Point::new(100.0, 60.0));
        session.pen_up();

        let submission = session.begin_check(&validator).unwrap();
        assert!(matches!(submission, Submission::Finished(ref r) if !r.accepted));
        assert_eq!(session.state(), AttemptState::Done);
        let rejected_attempt = session.attempt();

        // Finish the stroke on the same trace
        session.pen_down(Point::new(100.0, 60.0));
        for y in [100.0, 140.0, 180.0] {
            session.pen_move(Point::new(100.0, y));
        }
        session.pen_up();

        assert_eq!(session.state(), AttemptState::Drawing);
        assert_ne!(session.attempt(), rejected_attempt);
        assert_eq!(session.trace().point_count(), 6);

        let submission = session.begin_check(&validator).unwrap();
        assert!(matches!(submission, Submission::Finished(ref r) if r.accepted));
    }

    #[test]
    fn test_only_one_check_in_flight() {
        let validator = judged_validator(Behavior::Answer(true, Some("Yes")));
        let mut session = TraceSession::new('l', 200.0);
        draw(&mut session, &vertical_l());

        let pending = match session.begin_check(&validator).unwrap() {
            Submission::Pending(p) => p,
            other => panic!("expected pending check, got {:?}", other),
        };
        assert!(session.is_checking());
        assert_eq!(session.state(), AttemptState::Checking);

        assert!(matches!(
            session.begin_check(&validator),
            Err(ValidationError::CheckInFlight)
        ));

        let result = ValidationResult {
            accepted: true,
            feedback: Some("Yes".to_string()),
            resolution: Resolution::Judged,
        };
        assert!(session.resolve(pending.attempt, result));
        assert_eq!(session.state(), AttemptState::Confirmed);
        assert_eq!(session.feedback(), Some("Yes"));
        assert!(!session.is_checking());
    }

    #[test]
    fn test_stale_resolve_discarded_after_clear() {
        let validator = judged_validator(Behavior::Answer(true, None));
        let mut session = TraceSession::new('l', 200.0);
        draw(&mut session, &vertical_l());

        let pending = match session.begin_check(&validator).unwrap() {
            Submission::Pending(p) => p,
            other => panic!("expected pending check, got {:?}", other),
        };

        session.clear();
        session.pen_down(Point::new(10.0, 10.0));

        assert!(!session.resolve(pending.attempt, ValidationResult::fail_open()));
        assert_eq!(session.state(), AttemptState::Drawing);
        assert!(session.last_result().is_none());
        assert!(!session.is_checking());
    }

    #[test]
    fn test_missing_shape_leaves_state() {
        let validator = local_validator();
        let mut session = TraceSession::new('~', 200.0);
        session.pen_down(Point::new(1.0, 1.0));

        assert!(matches!(
            session.begin_check(&validator),
            Err(ValidationError::NoShapeDefined('~'))
        ));
        assert_eq!(session.state(), AttemptState::Drawing);
    }

    #[tokio::test]
    async fn test_pad_submit_with_judge() {
        let validator = Arc::new(judged_validator(Behavior::Unavailable));
        let pad = TracePad::new('l', 200.0, validator);
        pad.with_session(|s| draw(s, &vertical_l()));

        let result = pad.submit().await.unwrap().unwrap();
        assert_eq!(result, ValidationResult::fail_open());
        assert_eq!(pad.with_session(|s| s.state()), AttemptState::Confirmed);
    }

    #[tokio::test]
    async fn test_judge_rejection_is_not_confirmed() {
        let validator = Arc::new(judged_validator(Behavior::Answer(false, Some("Try again"))));
        let pad = TracePad::new('l', 200.0, validator);
        pad.with_session(|s| draw(s, &vertical_l()));

        let result = pad.submit().await.unwrap().unwrap();
        assert!(!result.accepted);

        pad.with_session(|s| {
            assert_eq!(s.state(), AttemptState::JudgeRejected);
            assert_eq!(s.feedback(), Some("Try again"));
            assert!(!s.is_checking());

            // Another stroke starts a fresh attempt
            let rejected = s.attempt();
            s.pen_down(Point::new(100.0, 20.0));
            assert_eq!(s.state(), AttemptState::Drawing);
            assert_ne!(s.attempt(), rejected);
            assert!(s.feedback().is_none());
        });
    }

    #[tokio::test]
    async fn test_pad_discards_response_after_restart() {
        let judge = GatedJudge {
            entered: Notify::new(),
            release: Notify::new(),
        };
        let validator = Arc::new(TwoStageValidator::new(
            ShapeLibrary::builtin(),
            WaypointValidator::new(),
            Some(judge),
        ));
        let pad = TracePad::new('l', 200.0, Arc::clone(&validator));
        pad.with_session(|s| draw(s, &vertical_l()));

        let submitting = pad.clone();
        let task = tokio::spawn(async move { submitting.submit().await });

        let judge = validator_judge(&validator);
        judge.entered.notified().await;
        assert!(pad.with_session(|s| s.is_checking()));

        // Learner restarts while the judge is still thinking
        pad.with_session(|s| {
            s.clear();
            s.pen_down(Point::new(30.0, 30.0));
        });
        judge.release.notify_one();

        let outcome = task.await.unwrap().unwrap();
        assert!(outcome.is_none());
        pad.with_session(|s| {
            assert_eq!(s.state(), AttemptState::Drawing);
            assert!(s.last_result().is_none());
            assert!(s.feedback().is_none());
        });
    }

    fn validator_judge(validator: &TwoStageValidator<GatedJudge>) -> &GatedJudge {
        validator.judge().unwrap()
    }
}
