use sa_core::{
    AnalysisResult, Article, Error, FinalReport, NewsProvider, PipelineError, Stage, StockAnalyzer,
};
use sa_storage::{RunStats, StatsLog};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

/// Where a run is. Linear, with `Failed` reachable from anything but `Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Start,
    Fetched,
    Filtered,
    Analyzed,
    Synthesized,
    Done,
    Failed,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Start => "START",
            RunState::Fetched => "FETCHED",
            RunState::Filtered => "FILTERED",
            RunState::Analyzed => "ANALYZED",
            RunState::Synthesized => "SYNTHESIZED",
            RunState::Done => "DONE",
            RunState::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

/// Everything a successful run produced.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub report: FinalReport,
    pub analysis: AnalysisResult,
}

/// Fetch, filter, score and synthesize for one ticker at a time.
///
/// Every run appends exactly one row to the stats log, success or not.
pub struct Pipeline {
    provider: Arc<dyn NewsProvider>,
    analyzer: Arc<dyn StockAnalyzer>,
    stats: Arc<StatsLog>,
}

impl Pipeline {
    pub fn new(provider: Arc<dyn NewsProvider>, analyzer: Arc<dyn StockAnalyzer>, stats: Arc<StatsLog>) -> Self {
        Self {
            provider,
            analyzer,
            stats,
        }
    }

    pub fn stats(&self) -> &StatsLog {
        &self.stats
    }

    pub async fn run(
        &self,
        ticker: &str,
        fetch_count: usize,
        inference_count: usize,
    ) -> Result<FinalReport, PipelineError> {
        self.run_detailed(ticker, fetch_count, inference_count)
            .await
            .map(|output| output.report)
    }

    pub async fn run_detailed(
        &self,
        ticker: &str,
        fetch_count: usize,
        inference_count: usize,
    ) -> Result<PipelineOutput, PipelineError> {
        info!("🚀 Starting sentiment analysis for {}", ticker);
        let mut stats = RunStats::begin(ticker, fetch_count, inference_count);
        let mut state = RunState::Start;

        let outcome = self
            .execute(ticker, fetch_count, inference_count, &mut state, &mut stats)
            .await;

        match &outcome {
            Ok(_) => advance(&mut state, RunState::Done, ticker),
            Err(e) => {
                error!("🛑 {} failed at {}: {}", ticker, e.stage, e.message());
                advance(&mut state, RunState::Failed, ticker);
                stats.fail(e.stage, &e.message());
            }
        }
        stats.finish();

        self.save_stats(stats.clone()).await;
        info!("🏁 {} finished in {:.2}s ({})", ticker, stats.total_runtime_sec, stats.run_status.as_str());
        outcome
    }

    /// CSV writes are blocking file IO, so they go to the blocking pool.
    async fn save_stats(&self, stats: RunStats) {
        let log = Arc::clone(&self.stats);
        match tokio::task::spawn_blocking(move || log.append(&stats)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!("❌ Could not save run statistics: {}", e),
            Err(e) => error!("❌ Run statistics writer aborted: {}", e),
        }
    }

    async fn execute(
        &self,
        ticker: &str,
        fetch_count: usize,
        inference_count: usize,
        state: &mut RunState,
        stats: &mut RunStats,
    ) -> Result<PipelineOutput, PipelineError> {
        // FETCH
        let started = Instant::now();
        let fetched = self.provider.fetch_articles(ticker, fetch_count).await;
        let retries = self.stats.take_retries(ticker);
        let returned = match fetched {
            Ok(articles) => articles,
            Err(e) => {
                stats.record_fetch_error(fetch_count, started.elapsed(), retries);
                return Err(PipelineError::new(Stage::Fetch, e));
            }
        };
        let articles: Vec<Article> = returned.iter().filter(|a| a.is_usable()).cloned().collect();
        stats.record_fetch(fetch_count, returned.len(), articles.len(), started.elapsed(), retries);
        if articles.is_empty() {
            return Err(PipelineError::new(Stage::Fetch, Error::NoArticles));
        }
        info!("📰 {} articles fetched for {}", articles.len(), ticker);
        advance(state, RunState::Fetched, ticker);

        // RAG
        let relevant = self
            .analyzer
            .filter_relevant(ticker, &articles, inference_count)
            .await
            .map_err(|e| PipelineError::new(Stage::Rag, e))?;
        stats.record_relevant(relevant.len());
        if relevant.is_empty() {
            return Err(PipelineError::new(Stage::Rag, Error::NoRelevantArticles));
        }
        advance(state, RunState::Filtered, ticker);

        // ANALYSIS
        let started = Instant::now();
        let analysis = self
            .analyzer
            .analyze(ticker, relevant)
            .await
            .map_err(|e| PipelineError::new(Stage::Analysis, e))?;
        stats.record_analysis(&analysis, started.elapsed());
        if !analysis.is_usable() {
            return Err(PipelineError::new(
                Stage::Analysis,
                Error::NoAnalysisItems {
                    errors: analysis.errors,
                },
            ));
        }
        advance(state, RunState::Analyzed, ticker);

        // SYNTHESIS
        let started = Instant::now();
        let report = self
            .analyzer
            .synthesize(ticker, &analysis.news_items)
            .await
            .map_err(|e| PipelineError::new(Stage::Synthesis, e))?;
        stats.record_synthesis(&report, started.elapsed());
        advance(state, RunState::Synthesized, ticker);

        Ok(PipelineOutput { report, analysis })
    }
}

fn advance(state: &mut RunState, next: RunState, ticker: &str) {
    debug!("{}: {} -> {}", ticker, state, next);
    *state = next;
}
