//! Helldraft Host
//!
//! Serves the WebSocket relay for multiplayer sessions, or with
//! `HELLDRAFT_DEMO=1` plays a deterministic solo run and verifies it
//! replays to the same digest.

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use helldraft::{
    reduce, Action, Catalog, Phase, PlayerId, RunState, VERSION,
    game::{
        events::RunEventData,
        mission::MissionReport,
        rules::RunRules,
        state::{GameConfig, Player},
    },
    network::{RelayServer, ServerConfig},
};

/// Safety stop for the demo loop.
const DEMO_MAX_STEPS: usize = 500;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    info!("Helldraft Host v{}", VERSION);

    let rules = match std::env::var("HELLDRAFT_RULES") {
        Ok(path) => RunRules::load(&path).with_context(|| format!("loading rules from {}", path))?,
        Err(_) => RunRules::default(),
    };
    let catalog = Catalog::builtin().context("loading item catalog")?;
    info!("Catalog: {} items", catalog.len());

    if std::env::var("HELLDRAFT_DEMO").is_ok_and(|v| v == "1") {
        return demo_run(&catalog, rules);
    }

    let config = ServerConfig::from_env()?;
    let server = RelayServer::new(config);

    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl-C received");
            server.shutdown();
        }
    }
    Ok(())
}

/// Choose the demo's next action, or `None` when the run is over.
fn next_action(state: &RunState, player_id: PlayerId) -> Option<Action> {
    match state.phase {
        Phase::Menu => Some(Action::SetPhase(Phase::Config)),
        Phase::Config => {
            if state.players.is_empty() {
                let player = Player::new(player_id, "Demo", state.rules.default_loadout.clone(), &state.rules);
                Some(Action::SetPlayers(vec![player]))
            } else {
                Some(Action::StartRun)
            }
        }
        Phase::Dashboard if state.draft_ready => Some(Action::OpenDraft),
        Phase::Dashboard => Some(Action::RunMission(MissionReport::clean(true))),
        Phase::MissionResult => Some(Action::ContinueFromMission),
        Phase::Draft => match &state.draft {
            Some(draft) if draft.pending_stratagem.is_some() => {
                Some(Action::ReplaceStratagem { player_id, slot: 0 })
            }
            _ => Some(Action::PickCard { player_id, index: 0 }),
        },
        _ => None,
    }
}

/// Play a solo run to its end, then replay the recorded actions from the
/// same seed and compare digests.
fn demo_run(catalog: &Catalog, rules: RunRules) -> anyhow::Result<()> {
    info!("=== Starting Demo Run ===");

    let config = GameConfig { seed: 12345, ..GameConfig::default() };
    let player_id = PlayerId::new([1; 16]);
    let initial = RunState::new(config, rules);
    info!("Seed: {}", initial.config.seed);

    let mut state = initial.clone();
    let mut log: Vec<Action> = Vec::new();

    for _ in 0..DEMO_MAX_STEPS {
        let Some(action) = next_action(&state, player_id) else { break };
        let reduction = reduce(&state, &action, catalog);

        if let Some(err) = &reduction.error {
            warn!(action = action.name(), error = %err, "Demo action rejected, stopping");
            break;
        }

        for event in &reduction.events {
            match &event.data {
                RunEventData::CardPicked { item_ids, .. } => info!("Drafted {}", item_ids.join(" + ")),
                RunEventData::MissionResolved { summary } => info!("Mission resolved: {:?}", summary),
                RunEventData::RunEnded { outcome } => info!("Run ended: {:?}", outcome),
                RunEventData::PhaseChanged { new_phase, .. } => {
                    info!("Phase {:?} (difficulty {}, requisition {})", new_phase, reduction.state.difficulty, reduction.state.requisition)
                }
                _ => {}
            }
        }

        state = reduction.state;
        log.push(action);
    }

    info!("=== Run Results ===");
    let hash = state.compute_hash()?;
    info!("Final State Hash: {}", hex::encode(hash));
    if let Some(player) = state.player(&player_id) {
        info!("Inventory ({}): {:?}", player.inventory.len(), player.inventory);
    }
    info!("Actions applied: {}", log.len());

    info!("=== Verifying Determinism ===");
    let replayed = log
        .iter()
        .fold(initial, |s, action| reduce(&s, action, catalog).state);
    let replay_hash = replayed.compute_hash()?;
    info!("Replay State Hash: {}", hex::encode(replay_hash));

    if hash == replay_hash {
        info!("DETERMINISM VERIFIED: Hashes match!");
        Ok(())
    } else {
        anyhow::bail!("determinism failure: replay digest differs")
    }
}
