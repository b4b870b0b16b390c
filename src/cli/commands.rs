use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::Serialize;

use crate::cli::flags::{Cli, Command, ReportAction, SosAction, TipAction, WatchTarget};
use crate::cli::output::{emit, render_many, render_one, MarkdownRender, OutputFormat};
use crate::config::load_config;
use crate::core::engine::Engine;
use crate::core::time::{now_utc, parse_range, window_start};
use crate::core::types::{
    Attachment, AttachmentKind, Author, Category, Contact, Coordinate, DistressFilter,
    DistressStatus, NewReport, Principal, ReportFilter, ReportStatus,
};
use crate::geocode::NominatimResolver;
use crate::insights::{dashboard_summary, heatmap::heatmap};
use crate::sync::{Coordinator, Poller};

struct Ctx {
    engine: Arc<Engine>,
    principal: Principal,
    format: OutputFormat,
    output: Option<std::path::PathBuf>,
}

impl Ctx {
    fn emit(&self, text: &str) -> Result<()> {
        emit(text, self.output.as_deref())
    }
}

pub async fn run(cli: Cli) -> Result<()> {
    let mut cfg = load_config(cli.config.as_deref())?;
    if let Some(db) = &cli.db {
        cfg.db_path = db.clone();
    }
    let engine = Engine::open(cfg).with_context(|| "opening record store")?;
    let ctx = Ctx {
        engine: Arc::new(engine),
        principal: Principal::new(cli.as_user.clone(), cli.name.clone()),
        format: cli.format.into(),
        output: cli.output.clone(),
    };

    match cli.command {
        Command::Report { action } => run_report(&ctx, action).await,
        Command::Sos { action } => run_sos(&ctx, action),
        Command::Tip { action } => run_tip(&ctx, action),
        Command::Summary => run_summary(&ctx),
        Command::Heatmap { category, range } => run_heatmap(&ctx, category, &range),
        Command::Watch {
            target,
            interval,
            ticks,
        } => run_watch(&ctx, target, interval, ticks).await,
    }
}

async fn run_report(ctx: &Ctx, action: ReportAction) -> Result<()> {
    match action {
        ReportAction::Create {
            category,
            description,
            anonymous,
            lat,
            lng,
            media,
            diary,
            geocode,
        } => {
            let location = match (lat, lng) {
                (Some(lat), Some(lng)) => Some(Coordinate::new(lat, lng)?),
                _ => None,
            };
            let input = NewReport {
                category: category.parse::<Category>()?,
                description,
                reporter: Author::resolve(&ctx.principal, anonymous),
                location,
                media_urls: media,
                diary: diary.map(|uri| Attachment {
                    kind: AttachmentKind::infer(&uri),
                    uri,
                }),
            };
            let id = ctx.engine.create_report(input)?;
            if geocode {
                locate_report(ctx, &id).await;
            }
            let report = ctx.engine.get_report(&id)?;
            ctx.emit(&render_one(&report, ctx.format)?)
        }
        ReportAction::List {
            status,
            category,
            search,
            range,
            mine,
            limit,
        } => {
            let filter = ReportFilter {
                status: status.as_deref().map(str::parse::<ReportStatus>).transpose()?,
                category: category.as_deref().map(str::parse::<Category>).transpose()?,
                reporter_id: mine.then(|| ctx.principal.id.clone()),
                since: range
                    .as_deref()
                    .map(parse_range)
                    .transpose()?
                    .map(|d| window_start(now_utc(), d)),
                search,
                limit,
            };
            let reports = ctx.engine.list_reports(&filter)?;
            ctx.emit(&render_many("Reports", &reports, ctx.format)?)
        }
        ReportAction::Show { id } => {
            let report = ctx.engine.get_report(&id)?;
            ctx.emit(&render_one(&report, ctx.format)?)
        }
        ReportAction::Status { id, status } => {
            let report = ctx.engine.set_report_status(&id, &status)?;
            ctx.emit(&render_one(&report, ctx.format)?)
        }
        ReportAction::Locate { id } => {
            let report = ctx.engine.get_report(&id)?;
            if report.location.is_none() {
                return Err(anyhow!("report {} has no coordinate to resolve", id));
            }
            locate_report(ctx, &id).await;
            let report = ctx.engine.get_report(&id)?;
            ctx.emit(&render_one(&report, ctx.format)?)
        }
    }
}

/// Geocoding is best-effort: the report stands without an address on failure.
/// Returns whether an address was attached.
async fn locate_report(ctx: &Ctx, id: &str) -> bool {
    let geocoder = &ctx.engine.config.geocoder;
    if !geocoder.enabled {
        tracing::warn!("geocoder disabled in config; report {} keeps no address", id);
        return false;
    }
    let report = match ctx.engine.get_report(id) {
        Ok(report) => report,
        Err(err) => {
            tracing::warn!("cannot geocode {}: {}", id, err);
            return false;
        }
    };
    let Some(at) = report.location else {
        tracing::warn!("report {} has no coordinate to resolve", id);
        return false;
    };
    let resolved = match NominatimResolver::new(geocoder) {
        Ok(resolver) => resolver.resolve(at).await,
        Err(err) => Err(err),
    };
    match resolved {
        Ok(address) => match ctx.engine.attach_address(id, address) {
            Ok(_) => true,
            Err(err) => {
                tracing::warn!("attaching address to {} failed: {}", id, err);
                false
            }
        },
        Err(err) => {
            tracing::warn!("reverse geocoding failed for {}: {}", id, err);
            false
        }
    }
}

fn run_sos(ctx: &Ctx, action: SosAction) -> Result<()> {
    match action {
        SosAction::Raise {
            lat,
            lng,
            phone,
            email,
            label,
        } => {
            let location = match (lat, lng) {
                (Some(lat), Some(lng)) => Some(Coordinate::new(lat, lng)?),
                _ => None,
            };
            let contact = Contact::snapshot(
                ctx.principal.display_name.as_deref(),
                phone.as_deref(),
                email.as_deref(),
            );
            let id = ctx
                .engine
                .create_distress_signal(&ctx.principal, location, contact, label)?;
            let signal = ctx.engine.get_distress_signal(&id)?;
            ctx.emit(&render_one(&signal, ctx.format)?)
        }
        SosAction::List {
            status,
            mine,
            limit,
        } => {
            let filter = DistressFilter {
                status: status.as_deref().map(str::parse::<DistressStatus>).transpose()?,
                originator_id: mine.then(|| ctx.principal.id.clone()),
                limit,
            };
            let signals = ctx.engine.list_distress_signals(&filter)?;
            ctx.emit(&render_many("Distress signals", &signals, ctx.format)?)
        }
        SosAction::Show { id } => {
            let signal = ctx.engine.get_distress_signal(&id)?;
            ctx.emit(&render_one(&signal, ctx.format)?)
        }
        SosAction::Dispatch { id } => {
            let signal = ctx.engine.transition_distress(&id, DistressStatus::Dispatched.as_str())?;
            ctx.emit(&render_one(&signal, ctx.format)?)
        }
        SosAction::Respond { id } => {
            let signal = ctx.engine.transition_distress(&id, DistressStatus::Responded.as_str())?;
            ctx.emit(&render_one(&signal, ctx.format)?)
        }
    }
}

fn run_tip(ctx: &Ctx, action: TipAction) -> Result<()> {
    match action {
        TipAction::Add {
            report_id,
            text,
            anonymous,
        } => {
            let author = Author::resolve(&ctx.principal, anonymous);
            let id = ctx.engine.add_tip(&report_id, author, &text)?;
            let tip = ctx.engine.get_tip(&id)?;
            ctx.emit(&render_one(&tip, ctx.format)?)
        }
        TipAction::List { report_id } => {
            let tips = ctx.engine.list_tips(&report_id)?;
            ctx.emit(&render_many("Tips", &tips, ctx.format)?)
        }
        TipAction::Vote { tip_id, direction } => {
            let tally = ctx.engine.cast_vote(&tip_id, &ctx.principal.id, direction)?;
            ctx.emit(&serde_json::json!({ "tip_id": tip_id, "tally": tally }).to_string())
        }
        TipAction::Retract { tip_id } => {
            let tally = ctx.engine.retract_vote(&tip_id, &ctx.principal.id)?;
            ctx.emit(&serde_json::json!({ "tip_id": tip_id, "tally": tally }).to_string())
        }
    }
}

fn run_summary(ctx: &Ctx) -> Result<()> {
    let reports = ctx.engine.list_reports(&ReportFilter::default())?;
    let signals = ctx.engine.list_distress_signals(&DistressFilter::default())?;
    let summary = dashboard_summary(&reports, &signals, &ctx.engine.config.dashboard, now_utc());
    ctx.emit(&render_one(&summary, ctx.format)?)
}

fn run_heatmap(ctx: &Ctx, category: Option<String>, range: &str) -> Result<()> {
    let category = category.as_deref().map(str::parse::<Category>).transpose()?;
    let range = parse_range(range)?;
    let reports = ctx.engine.list_reports(&ReportFilter::default())?;
    let view = heatmap(&reports, category, range, now_utc());
    ctx.emit(&render_one(&view, ctx.format)?)
}

async fn run_watch(
    ctx: &Ctx,
    target: WatchTarget,
    interval: Option<u64>,
    ticks: Option<u32>,
) -> Result<()> {
    let mut schedule = *Coordinator::new(ctx.engine.clone()).schedule();
    if let Some(secs) = interval.filter(|s| *s > 0) {
        schedule.sos_interval = Duration::from_secs(secs);
        schedule.reports_interval = Duration::from_secs(secs);
    }
    let coordinator = Coordinator::with_schedule(ctx.engine.clone(), schedule);
    tracing::info!("watching {:?} (staleness bound {:?})", target, schedule.max_staleness);

    match target {
        WatchTarget::Sos => {
            let poller = coordinator.watch_distress(DistressFilter {
                status: Some(DistressStatus::Active),
                ..Default::default()
            });
            follow(ctx, "Active SOS", poller, ticks).await
        }
        WatchTarget::Reports => {
            let poller = coordinator.watch_reports(ReportFilter::default());
            follow(ctx, "Reports", poller, ticks).await
        }
    }
}

async fn follow<T>(ctx: &Ctx, title: &str, poller: Poller<T>, ticks: Option<u32>) -> Result<()>
where
    T: Serialize + MarkdownRender + Send + Sync + 'static,
{
    let mut rx = poller.subscribe();
    let mut seen = 0u32;
    let outcome = loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
            }
            _ = tokio::signal::ctrl_c() => break Ok(()),
        }
        let snapshot = rx.borrow_and_update().clone();
        if let Some(snap) = snapshot {
            if let Err(err) = render_many(title, &snap.items, ctx.format).and_then(|t| ctx.emit(&t)) {
                break Err(err);
            }
        }
        seen += 1;
        if ticks.is_some_and(|t| seen >= t) {
            break Ok(());
        }
    };
    poller.shutdown().await;
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::core::memory_store::MemoryStore;

    fn ctx_with_geocoder(enabled: bool) -> Ctx {
        let mut cfg = AppConfig::default();
        cfg.geocoder.enabled = enabled;
        // unroutable, so an attempted lookup fails fast
        cfg.geocoder.base_url = "http://127.0.0.1:9".into();
        cfg.geocoder.timeout_ms = 200;
        Ctx {
            engine: Arc::new(Engine::new(Arc::new(MemoryStore::new()), cfg)),
            principal: Principal::new("op", None),
            format: OutputFormat::Json,
            output: None,
        }
    }

    fn report_without_location(ctx: &Ctx) -> String {
        ctx.engine
            .create_report(NewReport {
                category: Category::Other,
                description: "Broken streetlight".into(),
                reporter: Author::Anonymous,
                location: None,
                media_urls: vec![],
                diary: None,
            })
            .unwrap()
    }

    #[tokio::test]
    async fn locate_skips_unknown_report() {
        let ctx = ctx_with_geocoder(true);
        assert!(!locate_report(&ctx, "rpt_missing").await);
    }

    #[tokio::test]
    async fn locate_skips_when_disabled_or_unlocated() {
        let disabled = ctx_with_geocoder(false);
        let id = report_without_location(&disabled);
        assert!(!locate_report(&disabled, &id).await);

        let enabled = ctx_with_geocoder(true);
        let id = report_without_location(&enabled);
        assert!(!locate_report(&enabled, &id).await);
        assert!(enabled.engine.get_report(&id).unwrap().address.is_none());
    }

    #[tokio::test]
    async fn locate_keeps_report_when_lookup_fails() {
        let ctx = ctx_with_geocoder(true);
        let id = ctx
            .engine
            .create_report(NewReport {
                category: Category::Theft,
                description: "Phone snatched".into(),
                reporter: Author::Anonymous,
                location: Some(Coordinate::new(23.81, 90.41).unwrap()),
                media_urls: vec![],
                diary: None,
            })
            .unwrap();
        assert!(!locate_report(&ctx, &id).await);
        assert!(ctx.engine.get_report(&id).unwrap().address.is_none());
    }
}
