// Two-stage trace validation
// Cheap geometric check first; the judge is only consulted on a local accept

use serde::{Deserialize, Serialize};

use crate::judge::{HandwritingJudge, JudgeError, JudgeVerdict};
use crate::render::{render_trace, RenderOptions, TraceImage};
use crate::trace::{ShapeLibrary, Trace, ValidationError, WaypointValidator};

/// How a validation result was reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// Geometry did not follow the reference path; judge not consulted
    LocalReject,

    /// Geometry accepted and no judge is configured
    LocalOnly,

    /// Geometry accepted and the judge answered
    Judged,

    /// Geometry accepted and the judge failed; accepted anyway
    FailOpen,
}

impl Resolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::LocalReject => "local_reject",
            Resolution::LocalOnly => "local_only",
            Resolution::Judged => "judged",
            Resolution::FailOpen => "fail_open",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "local_reject" => Resolution::LocalReject,
            "local_only" => Resolution::LocalOnly,
            "judged" => Resolution::Judged,
            "fail_open" => Resolution::FailOpen,
            _ => Resolution::LocalReject,
        }
    }
}

/// Outcome of validating one trace attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub accepted: bool,

    /// Only ever supplied by the judge
    pub feedback: Option<String>,

    pub resolution: Resolution,
}

impl ValidationResult {
    pub fn rejected() -> Self {
        ValidationResult {
            accepted: false,
            feedback: None,
            resolution: Resolution::LocalReject,
        }
    }

    pub fn local_only() -> Self {
        ValidationResult {
            accepted: true,
            feedback: None,
            resolution: Resolution::LocalOnly,
        }
    }

    pub fn judged(verdict: JudgeVerdict) -> Self {
        ValidationResult {
            accepted: verdict.valid,
            feedback: verdict.feedback,
            resolution: Resolution::Judged,
        }
    }

    /// Never block a learner's progress on infrastructure failures
    pub fn fail_open() -> Self {
        ValidationResult {
            accepted: true,
            feedback: None,
            resolution: Resolution::FailOpen,
        }
    }
}

/// Judge placeholder for validators that never leave the device
#[derive(Debug, Clone, Copy)]
pub enum NoJudge {}

impl HandwritingJudge for NoJudge {
    async fn evaluate(&self, _image: &TraceImage, _letter: char) -> Result<JudgeVerdict, JudgeError> {
        match *self {}
    }
}

/// Geometric gate followed by optional semantic confirmation
pub struct TwoStageValidator<J> {
    library: ShapeLibrary,
    validator: WaypointValidator,
    judge: Option<J>,
    render: RenderOptions,
}

impl TwoStageValidator<NoJudge> {
    /// Validator without a judge: a local accept is final
    pub fn local_only(library: ShapeLibrary, validator: WaypointValidator) -> Self {
        TwoStageValidator::new(library, validator, None)
    }
}

impl<J> TwoStageValidator<J> {
    pub fn new(library: ShapeLibrary, validator: WaypointValidator, judge: Option<J>) -> Self {
        TwoStageValidator {
            library,
            validator,
            judge,
            render: RenderOptions::default(),
        }
    }

    pub fn with_render_options(mut self, render: RenderOptions) -> Self {
        self.render = render;
        self
    }

    pub fn library(&self) -> &ShapeLibrary {
        &self.library
    }

    pub fn judge(&self) -> Option<&J> {
        self.judge.as_ref()
    }

    pub fn has_judge(&self) -> bool {
        self.judge.is_some()
    }

    /// Stage 1: synchronous geometric check on the flattened trace
    pub fn check_local(
        &self,
        trace: &Trace,
        letter: char,
        canvas_size: f32,
    ) -> Result<bool, ValidationError> {
        self.validator
            .validate_letter(&self.library, &trace.points(), letter, canvas_size)
    }
}

impl<J: HandwritingJudge> TwoStageValidator<J> {
    /// Stage 2: semantic confirmation of a locally accepted trace
    ///
    /// Any render or judge failure resolves to an accept without feedback.
    pub async fn confirm(&self, trace: &Trace, letter: char, canvas_size: f32) -> ValidationResult {
        let judge = match &self.judge {
            Some(judge) => judge,
            None => return ValidationResult::local_only(),
        };

        let image = match render_trace(trace, canvas_size, &self.render) {
            Ok(image) => image,
            Err(e) => {
                log::warn!("Could not render trace for '{}': {}; accepting", letter, e);
                return ValidationResult::fail_open();
            }
        };

        match judge.evaluate(&image, letter).await {
            Ok(verdict) => {
                log::info!("Judge verdict for '{}': valid={}", letter, verdict.valid);
                ValidationResult::judged(verdict)
            }
            Err(e) => {
                log::warn!("Judge unavailable for '{}': {}; accepting", letter, e);
                ValidationResult::fail_open()
            }
        }
    }

    /// Run both stages
    ///
    /// A local reject returns immediately without consulting the judge.
    pub async fn validate(
        &self,
        trace: &Trace,
        letter: char,
        canvas_size: f32,
    ) -> Result<ValidationResult, ValidationError> {
        if !self.check_local(trace, letter, canvas_size)? {
            return Ok(ValidationResult::rejected());
        }

        Ok(self.confirm(trace, letter, canvas_size).await)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::trace::Point;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone)]
    pub(crate) enum Behavior {
        Answer(bool, Option<&'static str>),
        Unavailable,
        Malformed,
    }

    /// Judge double that counts calls
    pub(crate) struct CountingJudge {
        pub calls: AtomicUsize,
        behavior: Behavior,
    }

    impl CountingJudge {
        pub fn new(behavior: Behavior) -> Self {
            CountingJudge {
                calls: AtomicUsize::new(0),
                behavior,
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl HandwritingJudge for CountingJudge {
        async fn evaluate(&self, image: &TraceImage, _letter: char) -> Result<JudgeVerdict, JudgeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert!(!image.png.is_empty());

            match &self.behavior {
                Behavior::Answer(valid, feedback) => Ok(JudgeVerdict {
                    valid: *valid,
                    feedback: feedback.map(str::to_string),
                }),
                Behavior::Unavailable => Err(JudgeError::RetriesExhausted(2)),
                Behavior::Malformed => Err(JudgeError::MalformedResponse("nope".to_string())),
            }
        }
    }

    pub(crate) fn vertical_l() -> Trace {
        Trace::from_strokes(&[(0..=16)
            .map(|i| Point::new(100.0, 20.0 + i as f32 * 10.0))
            .collect()])
    }

    pub(crate) fn horizontal_line() -> Trace {
        Trace::from_strokes(&[(0..=20).map(|i| Point::new(i as f32 * 10.0, 100.0)).collect()])
    }

    fn validator_with(behavior: Behavior) -> TwoStageValidator<CountingJudge> {
        TwoStageValidator::new(
            ShapeLibrary::builtin(),
            WaypointValidator::new(),
            Some(CountingJudge::new(behavior)),
        )
    }

    fn judge_calls(validator: &TwoStageValidator<CountingJudge>) -> usize {
        validator.judge.as_ref().map(|j| j.calls()).unwrap_or(0)
    }

    #[tokio::test]
    async fn test_local_reject_never_calls_judge() {
        let validator = validator_with(Behavior::Answer(true, None));

        let result = validator.validate(&horizontal_line(), 'l', 200.0).await.unwrap();
        assert_eq!(result, ValidationResult::rejected());

        let empty = validator.validate(&Trace::new(), 'l', 200.0).await.unwrap();
        assert!(!empty.accepted);

        assert_eq!(judge_calls(&validator), 0);
    }

    #[tokio::test]
    async fn test_judge_confirms_local_accept() {
        let validator = validator_with(Behavior::Answer(true, Some("Beautiful l!")));

        let result = validator.validate(&vertical_l(), 'l', 200.0).await.unwrap();
        assert!(result.accepted);
        assert_eq!(result.feedback.as_deref(), Some("Beautiful l!"));
        assert_eq!(result.resolution, Resolution::Judged);
        assert_eq!(judge_calls(&validator), 1);
    }

    #[tokio::test]
    async fn test_judge_can_reject_with_feedback() {
        let validator = validator_with(Behavior::Answer(false, Some("Try a straight line")));

        let result = validator.validate(&vertical_l(), 'l', 200.0).await.unwrap();
        assert!(!result.accepted);
        assert_eq!(result.feedback.as_deref(), Some("Try a straight line"));
        assert_eq!(result.resolution, Resolution::Judged);
    }

    #[tokio::test]
    async fn test_judge_failure_fails_open() {
        for behavior in [Behavior::Unavailable, Behavior::Malformed] {
            let validator = validator_with(behavior);

            let result = validator.validate(&vertical_l(), 'l', 200.0).await.unwrap();
            assert!(result.accepted);
            assert_eq!(result.feedback, None);
            assert_eq!(result.resolution, Resolution::FailOpen);
            assert_eq!(judge_calls(&validator), 1);
        }
    }

    #[tokio::test]
    async fn test_local_only_accept() {
        let validator = TwoStageValidator::local_only(ShapeLibrary::builtin(), WaypointValidator::new());
        assert!(!validator.has_judge());

        let result = validator.validate(&vertical_l(), 'l', 200.0).await.unwrap();
        assert_eq!(result, ValidationResult::local_only());
    }

    #[tokio::test]
    async fn test_missing_shape_is_error_not_reject() {
        let validator = validator_with(Behavior::Answer(true, None));

        let result = validator.validate(&vertical_l(), '%', 200.0).await;
        assert!(matches!(result, Err(ValidationError::NoShapeDefined('%'))));
        assert_eq!(judge_calls(&validator), 0);
    }

    #[test]
    fn test_resolution_string_round_trip() {
        for resolution in [
            Resolution::LocalReject,
            Resolution::LocalOnly,
            Resolution::Judged,
            Resolution::FailOpen,
        ] {
            assert_eq!(Resolution::from_string(resolution.as_str()), resolution);
        }
    }
}
