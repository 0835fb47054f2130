//! Reel Events Demo
//!
//! Drives a short autoplay session on a virtual clock, records it, exports
//! it, and audits the export.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use reel_events::{
    config::{TIMING_REEL_STOP_INTERVAL, TIMING_SPIN_DURATION},
    events::topic::{
        BalanceUpdated, LineWin, ReelSpinStarted, ReelSpinStopped, SpinCompleted, SpinRequested,
        SpinResult, SpinStarted,
    },
    export_session, verify_session_integrity, CoreConfig, EventContext, EventPayload, FRAME_MS,
    VERSION,
};

const REELS: u8 = 5;
const ROUNDS: u32 = 4;
const BET: i64 = 100;
const SYMBOLS: [&str; 6] = ["A", "K", "Q", "J", "7", "BAR"];

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Reel Events v{}", VERSION);

    let config = CoreConfig::from_env().context("reading REEL_* configuration")?;
    let ctx = EventContext::with_virtual_clock(config, 0);
    let balance = Arc::new(AtomicI64::new(100_000));

    install_game_logic(&ctx, Arc::clone(&balance));

    ctx.recorder.start_recording_with_seed(
        "golden-reels",
        balance.load(Ordering::SeqCst),
        BET,
        Some("demo-seed".into()),
    );

    let mut now = 0;
    for round in 0..ROUNDS {
        if round == 2 {
            ctx.turbo.set_active(true);
            info!(multiplier = ctx.turbo.multiplier(), "Turbo on");
        }

        let round_id = format!("round-{round}");
        ctx.bus.publish(SpinRequested { round_id: round_id.clone(), bet: BET });
        schedule_reels(&ctx, &round_id, round)?;

        // Run frames until the round's reels have all landed.
        while ctx.scheduler.pending() > 0 {
            now += FRAME_MS;
            ctx.tick(now);
        }
    }

    let session = ctx
        .recorder
        .stop_recording()
        .context("recorder was not running")?;
    info!(
        session = %session.id,
        events = session.events.len(),
        duration_ms = session.duration_ms().unwrap_or(0),
        "Session captured"
    );

    for stats in ctx.tracker.get_top_by_count(3) {
        info!(
            topic = %stats.topic,
            count = stats.count,
            avg_ms = stats.average_handler_time_ms,
            "Top topic"
        );
    }

    let text = export_session(&session);
    let report = ctx.audit(&text)?;
    info!(verified = report.verified, bytes = text.len(), "Export audited");

    // Tamper with a copy and show the audit failing.
    let mut forged = session.clone();
    if let Some(event) = forged
        .events
        .iter_mut()
        .find(|e| matches!(e.payload, EventPayload::SpinCompleted(_)))
    {
        if let EventPayload::SpinCompleted(p) = &mut event.payload {
            p.total_win += 1_000_000;
        }
    }
    if verify_session_integrity(&forged) {
        warn!("Forged session passed verification");
    } else {
        info!("Forged session rejected");
    }

    Ok(())
}

/// Spin lifecycle reactions: reels start on spin start, the result settles
/// the wallet once the last reel lands.
fn install_game_logic(ctx: &EventContext, balance: Arc<AtomicI64>) {
    {
        let bus = ctx.bus.clone();
        let balance = Arc::clone(&balance);
        ctx.bus.on::<SpinRequested, _>(move |spin, _| {
            let after = balance.fetch_sub(spin.bet, Ordering::SeqCst) - spin.bet;
            bus.publish(BalanceUpdated { balance: after, delta: -spin.bet });
            bus.publish(SpinStarted { round_id: spin.round_id.clone(), bet: spin.bet });
            Ok(())
        });
    }
    {
        let bus = ctx.bus.clone();
        ctx.bus.on::<SpinStarted, _>(move |spin, _| {
            for reel_index in 0..REELS {
                bus.publish(ReelSpinStarted { round_id: spin.round_id.clone(), reel_index });
            }
            Ok(())
        });
    }
    {
        let bus = ctx.bus.clone();
        ctx.bus.on::<ReelSpinStopped, _>(move |stop, _| {
            if stop.reel_index + 1 < REELS {
                return Ok(());
            }
            let (total_win, line_wins) = evaluate(&stop.round_id);
            bus.publish(SpinResult {
                round_id: stop.round_id.clone(),
                stops: (0..u32::from(REELS)).map(|r| stop_for(&stop.round_id, r)).collect(),
                total_win,
                line_wins,
            });
            let after = balance.fetch_add(total_win, Ordering::SeqCst) + total_win;
            if total_win > 0 {
                bus.publish(BalanceUpdated { balance: after, delta: total_win });
            }
            bus.publish(SpinCompleted {
                round_id: stop.round_id.clone(),
                total_win,
                balance: after,
            });
            Ok(())
        });
    }
}

fn schedule_reels(ctx: &EventContext, round_id: &str, round: u32) -> anyhow::Result<()> {
    let spin = ctx.timings.get(TIMING_SPIN_DURATION)?;
    let gap = ctx.timings.get(TIMING_REEL_STOP_INTERVAL)?;
    for reel in 0..REELS {
        let position = stop_for(round_id, u32::from(reel)) + round;
        ctx.scheduler.schedule(
            ReelSpinStopped {
                round_id: round_id.to_string(),
                reel_index: reel,
                stop_position: position,
                symbols: (0..3)
                    .map(|row| SYMBOLS[((position + row) as usize) % SYMBOLS.len()].to_string())
                    .collect(),
            },
            spin + i64::from(reel) * gap,
        );
    }
    Ok(())
}

fn stop_for(round_id: &str, reel: u32) -> u32 {
    let seed: u32 = round_id.bytes().map(u32::from).sum();
    (seed * 31 + reel * 17) % 64
}

fn evaluate(round_id: &str) -> (i64, Vec<LineWin>) {
    let seed: u32 = round_id.bytes().map(u32::from).sum();
    if seed % 2 == 0 {
        return (0, Vec::new());
    }
    let win = LineWin {
        line: seed % 20,
        symbol: SYMBOLS[(seed as usize) % SYMBOLS.len()].to_string(),
        count: 3,
        payout: BET * 5,
    };
    (win.payout, vec![win])
}
