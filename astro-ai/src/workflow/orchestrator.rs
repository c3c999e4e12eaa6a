//! Pipeline orchestrator
//!
//! Sequences name resolution, acquisition and analysis for one request,
//! drives the [`PipelineRun`] state machine and turns every failure into an
//! error-status response. Stages run strictly one after another inside the
//! calling task; CPU-heavy analysis is moved to the blocking pool.

use super::PipelineEvent;
use crate::acquisition::{plan_attempts, AcquiredImage, FieldOfView, ImageAcquirer};
use crate::analysis::{build_report, decode_luma, AnalysisPipeline};
use crate::artifacts::{
    already_used, encode_mask_png, validate_request_id, ArtifactKind, ArtifactStore,
};
use crate::clients::{build_http_client, is_remote_reference, ImageDownloader, SesameClient};
use crate::config::PipelineConfig;
use crate::language::{Intent, LanguageBackend, TemplateBackend};
use crate::models::{
    AnalysisTask, AnalyzeRequest, Artifact, PipelineResponse, PipelineRun, PipelineState, Target,
};
use crate::types::{NameResolver, PipelineError, PipelineResult};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Caption subject when the caller supplied only an image
const UNNAMED_IMAGE: &str = "the supplied image";

/// Per-run bookkeeping: state, event channel, cancellation
struct RunContext {
    request_id: String,
    run: PipelineRun,
    event_tx: Option<mpsc::Sender<PipelineEvent>>,
    cancel: CancellationToken,
}

impl RunContext {
    /// Emit event if channel configured; a closed channel cancels the run
    async fn emit_event(&self, event: PipelineEvent) {
        if let Some(tx) = &self.event_tx {
            if tx.send(event).await.is_err() {
                debug!(request_id = %self.request_id, "Event receiver dropped, cancelling run");
                self.cancel.cancel();
            }
        }
    }

    /// Transition into `state` and announce it
    async fn enter(&mut self, state: PipelineState) -> PipelineResult<()> {
        self.checkpoint()?;
        if !self.run.advance(state) {
            return Err(PipelineError::Internal(format!(
                "Illegal transition {:?} -> {:?}",
                self.run.state(),
                state
            )));
        }
        if let Some(message) = state.status_message() {
            info!(request_id = %self.request_id, state = ?state, "{}", message);
            self.emit_event(PipelineEvent::Status {
                message: message.to_string(),
                state,
            })
            .await;
        }
        Ok(())
    }

    fn checkpoint(&self) -> PipelineResult<()> {
        if self.cancel.is_cancelled() {
            Err(PipelineError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// What a successful run produced before the response is assembled
struct RunOutput {
    summary: String,
    results: Map<String, Value>,
    artifacts: Vec<Artifact>,
    warnings: Vec<String>,
}

impl RunOutput {
    fn new() -> Self {
        Self {
            summary: String::new(),
            results: Map::new(),
            artifacts: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

/// Request after intent extraction
enum Structured {
    Ready(AnalyzeRequest),
    /// Out of scope; carries the decline message
    Declined(String),
}

/// Wording inputs for captions and summaries
struct Caption {
    subject: String,
    band: String,
    user_message: Option<String>,
}

/// Orchestrates one request at a time per call; shareable across requests
pub struct PipelineOrchestrator {
    config: PipelineConfig,
    resolver: Arc<dyn NameResolver>,
    acquirer: ImageAcquirer,
    downloader: ImageDownloader,
    analysis: AnalysisPipeline,
    store: Arc<dyn ArtifactStore>,
    language: Arc<dyn LanguageBackend>,
}

impl PipelineOrchestrator {
    /// Orchestrator with the Sesame resolver and the template language backend
    pub fn new(config: PipelineConfig, store: Arc<dyn ArtifactStore>) -> PipelineResult<Self> {
        let http_client = build_http_client(&config)?;

        Ok(Self {
            resolver: Arc::new(SesameClient::new(http_client.clone(), &config)),
            acquirer: ImageAcquirer::new(http_client.clone(), &config, Arc::clone(&store)),
            downloader: ImageDownloader::new(http_client, &config),
            analysis: AnalysisPipeline::new(config.threshold_quantile),
            store,
            language: Arc::new(TemplateBackend),
            config,
        })
    }

    pub fn with_name_resolver(mut self, resolver: Arc<dyn NameResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_language_backend(mut self, language: Arc<dyn LanguageBackend>) -> Self {
        self.language = language;
        self
    }

    pub fn store(&self) -> &Arc<dyn ArtifactStore> {
        &self.store
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run without progress events
    pub async fn run(&self, request: AnalyzeRequest, cancel: CancellationToken) -> PipelineResponse {
        self.execute(request, None, cancel).await
    }

    /// Run, reporting progress on `event_tx`
    ///
    /// The returned response is also sent as the `end` event on success.
    pub async fn run_with_events(
        &self,
        request: AnalyzeRequest,
        event_tx: mpsc::Sender<PipelineEvent>,
        cancel: CancellationToken,
    ) -> PipelineResponse {
        self.execute(request, Some(event_tx), cancel).await
    }

    /// Run on a spawned task; events arrive on the returned receiver
    ///
    /// Cancelling the returned token (or dropping the receiver) stops the run
    /// at the next network call or stage boundary.
    pub fn spawn_stream(
        self: &Arc<Self>,
        request: AnalyzeRequest,
        buffer: usize,
    ) -> (mpsc::Receiver<PipelineEvent>, CancellationToken) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        let cancel = CancellationToken::new();
        let orchestrator = Arc::clone(self);
        let token = cancel.clone();

        tokio::spawn(async move {
            orchestrator.run_with_events(request, tx, token).await;
        });

        (rx, cancel)
    }

    async fn execute(
        &self,
        request: AnalyzeRequest,
        event_tx: Option<mpsc::Sender<PipelineEvent>>,
        cancel: CancellationToken,
    ) -> PipelineResponse {
        let mut ctx = RunContext {
            request_id: request.request_id.clone(),
            run: PipelineRun::new(),
            event_tx,
            cancel,
        };
        info!(
            request_id = %ctx.request_id,
            task = ?request.task.map(|t| t.as_str()),
            "Analysis request received"
        );

        match self.process(&mut ctx, request).await {
            Ok(output) => self.complete(&mut ctx, output).await,
            Err(e) => self.fail(&mut ctx, e).await,
        }
    }

    async fn complete(&self, ctx: &mut RunContext, output: RunOutput) -> PipelineResponse {
        ctx.run.advance(PipelineState::Completed);
        let response = PipelineResponse::success(
            ctx.request_id.clone(),
            output.summary,
            output.results,
            output.artifacts,
            output.warnings,
        );

        info!(
            request_id = %ctx.request_id,
            artifacts = response.artifacts.len(),
            warnings = response.warnings.len(),
            event = "analysis_completed",
            "Analysis completed"
        );

        ctx.emit_event(PipelineEvent::Summary {
            summary: response.summary.clone(),
        })
        .await;
        if !response.artifacts.is_empty() {
            ctx.emit_event(PipelineEvent::ArtifactsReady {
                request_id: ctx.request_id.clone(),
            })
            .await;
        }
        ctx.emit_event(PipelineEvent::End(response.clone())).await;
        response
    }

    async fn fail(&self, ctx: &mut RunContext, err: PipelineError) -> PipelineResponse {
        let failed_in = ctx.run.state();
        ctx.run.advance(PipelineState::Failed);

        match &err {
            PipelineError::Cancelled => {
                warn!(request_id = %ctx.request_id, state = ?failed_in, "Analysis cancelled")
            }
            e if e.is_internal() => error!(
                request_id = %ctx.request_id,
                state = ?failed_in,
                error_code = e.error_code(),
                error = %e,
                "Internal invariant violated"
            ),
            e => error!(
                request_id = %ctx.request_id,
                state = ?failed_in,
                error_code = e.error_code(),
                error = %e,
                event = "error",
                "Analysis failed"
            ),
        }

        let response = PipelineResponse::failure(ctx.request_id.clone(), &err);
        ctx.emit_event(PipelineEvent::Error {
            request_id: ctx.request_id.clone(),
            error_code: err.error_code().to_string(),
            message: response.summary.clone(),
            detail: err.to_string(),
        })
        .await;
        response
    }

    async fn process(
        &self,
        ctx: &mut RunContext,
        request: AnalyzeRequest,
    ) -> PipelineResult<RunOutput> {
        request.validate()?;
        validate_request_id(&request.request_id)?;
        if self.store.contains(&request.request_id).await? {
            return Err(already_used(&request.request_id));
        }

        let request = match self.structure(request).await? {
            Structured::Ready(request) => request,
            Structured::Declined(message) => {
                info!(request_id = %ctx.request_id, backend = self.language.name(), "Request declined");
                return Ok(declined(message));
            }
        };
        let task = request
            .task
            .ok_or_else(|| PipelineError::InvalidInput("A task is required".to_string()))?;

        let mut output = RunOutput::new();
        let (image_bytes, subject) = match request.image_reference() {
            Some(reference) => {
                let bytes = self.load_reference(ctx, reference).await?;
                // Local files are analyzed but never republished as artifacts
                if is_remote_reference(reference) {
                    output
                        .artifacts
                        .push(self.store.save(&ctx.request_id, ArtifactKind::Image, &bytes).await?);
                }
                let subject = request.target_name().unwrap_or(UNNAMED_IMAGE).to_string();
                (bytes, subject)
            }
            None => {
                let (target, acquired) = self.acquire(ctx, &request).await?;
                let AcquiredImage {
                    resolved,
                    bytes,
                    artifact,
                    failed_attempts,
                } = acquired;

                output.warnings.extend(failed_attempts);
                output.results.insert("resolved_image".to_string(), to_json(&resolved)?);
                output.artifacts.push(artifact);
                (bytes, target.label())
            }
        };

        let caption = Caption {
            subject,
            band: request.effective_band(),
            user_message: request.last_user_message(),
        };

        if task == AnalysisTask::FetchImageOnly {
            output.summary = self
                .language
                .image_caption(&caption.subject, &caption.band, caption.user_message.as_deref())
                .await?;
            return Ok(output);
        }

        self.analyze(ctx, task, image_bytes, &caption, &mut output).await?;
        Ok(output)
    }

    /// Turn a natural-language request into a structured one
    async fn structure(&self, mut request: AnalyzeRequest) -> PipelineResult<Structured> {
        if request.is_structured() {
            return Ok(Structured::Ready(request));
        }

        let messages = request.normalized_messages();
        match self.language.extract_intent(&messages).await? {
            Intent::Decline { message } => Ok(Structured::Declined(message)),
            Intent::Analyze {
                target,
                task,
                options,
            } => {
                debug!(request_id = %request.request_id, task = task.as_str(), "Intent extracted");
                request.target = Some(target);
                request.task = Some(task);

                let given = &mut request.options;
                given.catalog = given.catalog.take().or(options.catalog);
                given.band = given.band.take().or(options.band);
                given.size_arcmin = given.size_arcmin.or(options.size_arcmin);
                given.ra_deg = given.ra_deg.or(options.ra_deg);
                given.dec_deg = given.dec_deg.or(options.dec_deg);
                given.pixels = given.pixels.or(options.pixels);
                Ok(Structured::Ready(request))
            }
        }
    }

    /// Caller-supplied image: URL or local path, no state transition
    async fn load_reference(&self, ctx: &RunContext, reference: &str) -> PipelineResult<Vec<u8>> {
        ctx.checkpoint()?;
        debug!(request_id = %ctx.request_id, reference = %reference, "Loading supplied image");

        tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => Err(PipelineError::Cancelled),
            result = self.downloader.load(reference) => result,
        }
    }

    /// Plan, resolve (unless coordinates are given) and acquire
    async fn acquire(
        &self,
        ctx: &mut RunContext,
        request: &AnalyzeRequest,
    ) -> PipelineResult<(Target, AcquiredImage)> {
        // Planning validates the band, so a bad hint fails before any network call
        let attempts = plan_attempts(
            request.options.catalog.as_deref(),
            request.options.band.as_deref(),
        )?;
        let fov = self.field_of_view(request)?;

        let target = match request.explicit_coordinates()? {
            Some((ra_deg, dec_deg)) => {
                Target::new(request.target_name().map(str::to_string), ra_deg, dec_deg)?
            }
            None => {
                let name = request.target_name().ok_or_else(|| {
                    PipelineError::InvalidInput(
                        "Provide target.name or ra_deg/dec_deg, or an image_url".to_string(),
                    )
                })?;

                ctx.enter(PipelineState::ResolvingTarget).await?;
                let (ra_deg, dec_deg) = tokio::select! {
                    biased;
                    _ = ctx.cancel.cancelled() => Err(PipelineError::Cancelled),
                    result = self.resolver.resolve(name) => result,
                }?;
                info!(
                    request_id = %ctx.request_id,
                    resolver = self.resolver.name(),
                    name = %name,
                    ra_deg,
                    dec_deg,
                    "Target resolved"
                );
                Target::new(Some(name.to_string()), ra_deg, dec_deg)?
            }
        };

        ctx.enter(PipelineState::AcquiringImage).await?;
        let acquired = self
            .acquirer
            .acquire(&ctx.request_id, &target, &attempts, fov, &ctx.cancel)
            .await?;
        Ok((target, acquired))
    }

    fn field_of_view(&self, request: &AnalyzeRequest) -> PipelineResult<FieldOfView> {
        let size_arcmin = match request.options.size_arcmin {
            Some(size) if size.is_finite() && size > 0.0 => size,
            Some(size) => {
                return Err(PipelineError::InvalidInput(format!(
                    "size_arcmin must be a positive number, got {}",
                    size
                )))
            }
            None => self.config.default_size_arcmin,
        };

        Ok(FieldOfView {
            size_arcmin,
            pixels: Some(request.options.pixels.unwrap_or(self.config.default_pixels)),
        })
    }

    /// Segment, then measure and summarize as far as the task asks
    async fn analyze(
        &self,
        ctx: &mut RunContext,
        task: AnalysisTask,
        image_bytes: Vec<u8>,
        caption: &Caption,
        output: &mut RunOutput,
    ) -> PipelineResult<()> {
        ctx.enter(PipelineState::Segmenting).await?;
        let analysis = self.analysis;
        let (image, segmentation, mask_png) = tokio::task::spawn_blocking(move || {
            let image = decode_luma(&image_bytes)?;
            let segmentation = analysis.segment(&image)?;
            let mask_png = encode_mask_png(&segmentation.mask)?;
            Ok::<_, PipelineError>((image, segmentation, mask_png))
        })
        .await
        .map_err(|e| PipelineError::Internal(format!("Segmentation task failed: {}", e)))??;

        debug!(
            request_id = %ctx.request_id,
            threshold = segmentation.threshold,
            mask_pixels = segmentation.pixel_count,
            "Segmentation complete"
        );
        output
            .artifacts
            .push(self.store.save(&ctx.request_id, ArtifactKind::Mask, &mask_png).await?);
        output
            .results
            .insert("segmentation".to_string(), segmentation.metadata());
        output.summary = "Segmentation completed.".to_string();

        if !task.measures() {
            return Ok(());
        }

        ctx.enter(PipelineState::Measuring).await?;
        let mask = segmentation.mask;
        let measurements = tokio::task::spawn_blocking(move || analysis.measure(&image, &mask))
            .await
            .map_err(|e| PipelineError::Internal(format!("Measurement task failed: {}", e)))??;
        let measurements_json = to_json(&measurements)?;
        let measurements_bytes = serde_json::to_vec_pretty(&measurements_json)
            .map_err(|e| PipelineError::Internal(e.to_string()))?;
        output.artifacts.push(
            self.store
                .save(&ctx.request_id, ArtifactKind::Measurements, &measurements_bytes)
                .await?,
        );
        output
            .results
            .insert("measurements".to_string(), measurements_json);
        output.summary = "Basic measurements computed.".to_string();

        if task != AnalysisTask::MorphologySummary {
            return Ok(());
        }

        ctx.enter(PipelineState::Summarizing).await?;
        let morphology = self.analysis.summarize(&measurements);
        output
            .results
            .insert("morphology".to_string(), json!(morphology));

        let report = build_report(&ctx.request_id, &morphology, &output.results);
        output.artifacts.push(
            self.store
                .save(&ctx.request_id, ArtifactKind::Report, report.as_bytes())
                .await?,
        );

        output.summary = self
            .language
            .accompanying_summary(
                &caption.subject,
                &caption.band,
                &morphology,
                caption.user_message.as_deref(),
            )
            .await?;
        Ok(())
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> PipelineResult<Value> {
    serde_json::to_value(value).map_err(|e| PipelineError::Internal(e.to_string()))
}

/// Success envelope for an out-of-scope request
fn declined(message: String) -> RunOutput {
    let mut output = RunOutput::new();
    output.results.insert("out_of_scope".to_string(), json!(true));
    output.summary = message;
    output
}
