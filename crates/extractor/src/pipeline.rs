use std::time::Duration;

use tracing::{info, warn};

use challenge_solver::{ChallengeSolver, SolverError};

use crate::challenge::{ChallengeDetector, ChallengeVerdict};
use crate::config::PipelineConfig;
use crate::descriptor::{DescriptorParser, StreamDescriptor};
use crate::error::ExtractError;
use crate::session::{FetchResult, RoomFetcher};
use crate::target::RoomTarget;

/// The externally visible result of one extraction request. Exactly one is
/// produced per call to [`RecoveryPipeline::extract`].
#[derive(Debug)]
pub enum ExtractionOutcome {
    Resolved(StreamDescriptor),
    /// Recovery ran and the platform challenged the retried fetch as well.
    /// Terminal for this call; the caller may offer a manual retry.
    StillChallenged,
    /// The human did not clear the challenge within the solver budget.
    TimedOut,
    /// No candidate browser could be launched.
    BrowserUnavailable,
    Failed(ExtractError),
}

/// Sequences detector, solver, and cookie merger into the bounded recovery
/// protocol: at most two fetches and one interactive solve per call, never
/// a loop against a platform that keeps re-challenging.
pub struct RecoveryPipeline<F, S> {
    fetcher: F,
    solver: S,
    detector: ChallengeDetector,
    parser: DescriptorParser,
    solver_timeout: Duration,
}

impl<F, S> RecoveryPipeline<F, S>
where
    F: RoomFetcher,
    S: ChallengeSolver,
{
    pub fn new(fetcher: F, solver: S, config: &PipelineConfig) -> Self {
        Self {
            fetcher,
            solver,
            detector: config.detector(),
            parser: DescriptorParser::default(),
            solver_timeout: config.solver_timeout(),
        }
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn fetcher_mut(&mut self) -> &mut F {
        &mut self.fetcher
    }

    pub fn solver(&self) -> &S {
        &self.solver
    }

    pub async fn extract(&mut self, target: &RoomTarget) -> ExtractionOutcome {
        let first = match self.fetcher.fetch(target).await {
            Ok(result) => result,
            Err(e) => return ExtractionOutcome::Failed(e),
        };

        if self.classify(&first, "initial") != ChallengeVerdict::Challenged {
            return self.parse(&first);
        }

        info!(
            room = target.room_id(),
            "challenge detected, starting interactive recovery"
        );
        let recovered = match self.solver.solve(target.url(), self.solver_timeout).await {
            Ok(cookies) => cookies,
            Err(SolverError::BrowserUnavailable) => return ExtractionOutcome::BrowserUnavailable,
            Err(SolverError::Timeout(_)) => return ExtractionOutcome::TimedOut,
            Err(SolverError::Cancelled) => {
                return ExtractionOutcome::Failed(ExtractError::Cancelled);
            }
            Err(e) => return ExtractionOutcome::Failed(ExtractError::Solver(e.to_string())),
        };

        // The merge happens-before the retried fetch; no fetch observes a
        // half-merged cookie set.
        self.fetcher.merge_cookies(recovered);

        let second = match self.fetcher.fetch(target).await {
            Ok(result) => result,
            Err(e) => return ExtractionOutcome::Failed(e),
        };

        if self.classify(&second, "retry") == ChallengeVerdict::Challenged {
            // A human already resolved once; further retries only hammer the
            // platform.
            warn!(room = target.room_id(), "retried fetch still challenged");
            return ExtractionOutcome::StillChallenged;
        }

        self.parse(&second)
    }

    fn classify(&self, result: &FetchResult, attempt: &str) -> ChallengeVerdict {
        let verdict = self.detector.classify(&result.body);
        match verdict {
            ChallengeVerdict::Indeterminate => warn!(
                attempt,
                bytes = result.body.len(),
                "response too small to classify, treating as clean"
            ),
            _ => info!(
                attempt,
                verdict = ?verdict,
                bytes = result.body.len(),
                "response classified"
            ),
        }
        verdict
    }

    fn parse(&self, result: &FetchResult) -> ExtractionOutcome {
        match self.parser.parse(&result.body) {
            Ok(descriptor) => {
                info!(title = %descriptor.title, "stream descriptor resolved");
                ExtractionOutcome::Resolved(descriptor)
            }
            Err(e) => ExtractionOutcome::Failed(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use reqwest::StatusCode;
    use reqwest::header::HeaderMap;

    use challenge_solver::CookieSet;

    const MARKER: &str = "TTGCaptcha";

    fn challenge_body() -> String {
        let mut body = format!("<html>{MARKER} shell</html>");
        while body.len() < 2_048 {
            body.push(' ');
        }
        body
    }

    fn clean_body() -> String {
        let mut body =
            r#"<html>"title":"Room" "nickname":"Anchor" "https://pull.example.com/live/room_hd.flv""#
                .to_string();
        while body.len() < 4_096 {
            body.push('x');
        }
        body
    }

    fn indeterminate_body() -> String {
        "<html></html>".to_string()
    }

    struct ScriptedFetcher {
        bodies: Vec<String>,
        fetches: usize,
        merged: Vec<CookieSet>,
    }

    impl ScriptedFetcher {
        fn new(bodies: Vec<String>) -> Self {
            Self {
                bodies,
                fetches: 0,
                merged: Vec::new(),
            }
        }
    }

    #[async_trait]
    impl RoomFetcher for ScriptedFetcher {
        async fn fetch(&mut self, _target: &RoomTarget) -> Result<FetchResult, ExtractError> {
            let body = self
                .bodies
                .get(self.fetches)
                .cloned()
                .unwrap_or_else(|| panic!("unexpected fetch number {}", self.fetches + 1));
            self.fetches += 1;
            Ok(FetchResult {
                status: StatusCode::OK,
                headers: HeaderMap::new(),
                body,
            })
        }

        fn merge_cookies(&mut self, recovered: CookieSet) {
            self.merged.push(recovered);
        }
    }

    enum SolverScript {
        Cookies,
        Unavailable,
        Timeout,
        Cancelled,
    }

    struct FakeSolver {
        script: SolverScript,
        calls: AtomicUsize,
    }

    impl FakeSolver {
        fn new(script: SolverScript) -> Self {
            Self {
                script,
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn recovered_cookies() -> CookieSet {
            let mut cookies = CookieSet::default();
            cookies.insert("ttwid".to_string(), "fresh".to_string());
            cookies.insert("__ac_nonce".to_string(), "abc".to_string());
            cookies
        }
    }

    #[async_trait]
    impl ChallengeSolver for FakeSolver {
        async fn solve(
            &self,
            _room_url: &str,
            timeout: Duration,
        ) -> Result<CookieSet, SolverError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.script {
                SolverScript::Cookies => Ok(Self::recovered_cookies()),
                SolverScript::Unavailable => Err(SolverError::BrowserUnavailable),
                SolverScript::Timeout => Err(SolverError::Timeout(timeout)),
                SolverScript::Cancelled => Err(SolverError::Cancelled),
            }
        }
    }

    fn pipeline(
        bodies: Vec<String>,
        script: SolverScript,
    ) -> RecoveryPipeline<ScriptedFetcher, FakeSolver> {
        RecoveryPipeline::new(
            ScriptedFetcher::new(bodies),
            FakeSolver::new(script),
            &PipelineConfig::default(),
        )
    }

    fn target() -> RoomTarget {
        RoomTarget::parse("https://live.douyin.com/198671092027").unwrap()
    }

    #[tokio::test]
    async fn clean_page_resolves_without_browser() {
        let mut pipeline = pipeline(vec![clean_body()], SolverScript::Cookies);
        let outcome = pipeline.extract(&target()).await;

        let ExtractionOutcome::Resolved(descriptor) = outcome else {
            panic!("expected resolved outcome, got {outcome:?}");
        };
        assert_eq!(
            descriptor.stream_url,
            "https://pull.example.com/live/room_hd.flv"
        );
        assert_eq!(pipeline.fetcher().fetches, 1);
        assert_eq!(pipeline.solver().calls(), 0);
    }

    #[tokio::test]
    async fn repeated_clean_extractions_are_idempotent() {
        let mut pipeline = pipeline(vec![clean_body(), clean_body()], SolverScript::Cookies);

        let first = pipeline.extract(&target()).await;
        let second = pipeline.extract(&target()).await;

        let (ExtractionOutcome::Resolved(a), ExtractionOutcome::Resolved(b)) = (first, second)
        else {
            panic!("expected both extractions to resolve");
        };
        assert_eq!(a, b);
        assert_eq!(pipeline.solver().calls(), 0);
    }

    #[tokio::test]
    async fn challenge_then_recovery_resolves() {
        let mut pipeline = pipeline(
            vec![challenge_body(), clean_body()],
            SolverScript::Cookies,
        );
        let outcome = pipeline.extract(&target()).await;

        assert!(matches!(outcome, ExtractionOutcome::Resolved(_)));
        assert_eq!(pipeline.fetcher().fetches, 2);
        assert_eq!(pipeline.solver().calls(), 1);
        // Recovered cookies were merged before the retried fetch.
        assert_eq!(pipeline.fetcher().merged.len(), 1);
        assert_eq!(
            pipeline.fetcher().merged[0].get("ttwid"),
            Some(&"fresh".to_string())
        );
    }

    #[tokio::test]
    async fn solver_timeout_skips_the_retry_fetch() {
        let mut pipeline = pipeline(vec![challenge_body()], SolverScript::Timeout);
        let outcome = pipeline.extract(&target()).await;

        assert!(matches!(outcome, ExtractionOutcome::TimedOut));
        assert_eq!(pipeline.fetcher().fetches, 1);
        assert!(pipeline.fetcher().merged.is_empty());
    }

    #[tokio::test]
    async fn still_challenged_after_recovery_is_terminal() {
        let mut pipeline = pipeline(
            vec![challenge_body(), challenge_body()],
            SolverScript::Cookies,
        );
        let outcome = pipeline.extract(&target()).await;

        assert!(matches!(outcome, ExtractionOutcome::StillChallenged));
        assert_eq!(pipeline.fetcher().fetches, 2);
        assert_eq!(pipeline.solver().calls(), 1);
    }

    #[tokio::test]
    async fn browser_unavailable_propagates_unchanged() {
        let mut pipeline = pipeline(vec![challenge_body()], SolverScript::Unavailable);
        let outcome = pipeline.extract(&target()).await;

        assert!(matches!(outcome, ExtractionOutcome::BrowserUnavailable));
        assert_eq!(pipeline.fetcher().fetches, 1);
    }

    #[tokio::test]
    async fn cancellation_surfaces_as_failure() {
        let mut pipeline = pipeline(vec![challenge_body()], SolverScript::Cancelled);
        let outcome = pipeline.extract(&target()).await;

        assert!(matches!(
            outcome,
            ExtractionOutcome::Failed(ExtractError::Cancelled)
        ));
    }

    #[tokio::test]
    async fn indeterminate_is_parsed_without_browser() {
        let mut pipeline = pipeline(vec![indeterminate_body()], SolverScript::Cookies);
        let outcome = pipeline.extract(&target()).await;

        // Too small to classify and too small to parse, but the browser is
        // never involved in a single pass.
        assert!(matches!(
            outcome,
            ExtractionOutcome::Failed(ExtractError::Parse(_))
        ));
        assert_eq!(pipeline.solver().calls(), 0);
    }

    #[tokio::test]
    async fn work_is_bounded_for_every_verdict_sequence() {
        let bodies = [challenge_body, clean_body, indeterminate_body];
        for first in &bodies {
            for second in &bodies {
                let mut pipeline = pipeline(
                    vec![first(), second(), first(), second()],
                    SolverScript::Cookies,
                );
                let _ = pipeline.extract(&target()).await;
                assert!(pipeline.fetcher().fetches <= 2);
                assert!(pipeline.solver().calls() <= 1);
            }
        }
    }
}
