//! Cipher Hunt device binary: terminal front end over the game engine.

use std::{env, sync::Arc};

use anyhow::Context;
use tokio::io::{self, AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use cipher_hunt::anticheat::Visibility;
use cipher_hunt::config::HuntConfig;
use cipher_hunt::control::SoundCue;
use cipher_hunt::dao::{MemoryStore, ParticipantStore, RestConfig, RestStore};
use cipher_hunt::engine::runtime::{self, EngineHandle, PlayerAction};
use cipher_hunt::engine::{Notice, SoundEffect};
use cipher_hunt::leaderboard::format_time;
use cipher_hunt::state::signals::SignalChange;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = HuntConfig::load().context("loading game configuration")?;
    let store = select_store().context("connecting the participant store")?;

    let (handle, notices, mut engine_task) = runtime::spawn(config, store);
    tokio::spawn(print_notices(notices));
    tokio::spawn(read_commands(handle));

    tokio::select! {
        _ = shutdown_signal() => info!("shutting down"),
        _ = &mut engine_task => info!("engine loop ended; shutting down"),
    }

    Ok(())
}

/// Pick the participant store from the environment: REST when configured,
/// otherwise a device-local fallback.
fn select_store() -> anyhow::Result<Arc<dyn ParticipantStore>> {
    if env::var_os("HUNT_STORE_URL").is_some() {
        let config = RestConfig::from_env().context("reading store settings")?;
        let store = RestStore::connect(config).context("building the store client")?;
        info!("using the REST participant store");
        Ok(Arc::new(store))
    } else {
        warn!("HUNT_STORE_URL not set; using an in-memory store, nothing is shared");
        Ok(Arc::new(MemoryStore::new()))
    }
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Print every engine notice until the engine loop drops the channel.
async fn print_notices(mut notices: tokio::sync::mpsc::UnboundedReceiver<Notice>) {
    while let Some(notice) = notices.recv().await {
        render(&notice);
    }
}

fn render(notice: &Notice) {
    match notice {
        Notice::Registered {
            username,
            participant_id,
        } => {
            println!("Registered as {username}.");
            println!("Session id: {participant_id} (keep it to resume on another device).");
        }
        Notice::RegistrationFailed { reason } => println!("Registration failed: {reason}"),
        Notice::Resumed {
            username,
            round,
            score,
            lifelines,
        } => println!(
            "Welcome back {username}: round {round}, score {score}, {lifelines} lifelines."
        ),
        Notice::ResumeFailed { reason } => println!("Resume failed: {reason}"),
        Notice::AwaitingGate { round, title } => {
            println!("Round {round}: {title}. Find the gate and scan its code.");
        }
        Notice::GateRejected { round } => println!("That code does not open round {round}."),
        Notice::RoundStarted {
            round,
            title,
            questions,
        } => println!("Round {round} ({title}) unlocked: {questions} questions ahead."),
        Notice::QuestionPresented {
            number,
            total,
            question,
            countdown_secs,
            ..
        } => {
            println!();
            println!("Question {number}/{total}: {}", question.prompt);
            if let Some(image) = &question.image {
                println!("  [image] {image}");
            }
            for (index, option) in question.options.iter().enumerate() {
                let letter = (b'a' + index as u8) as char;
                println!("  {letter}) {option}");
            }
            println!("{countdown_secs}s on the clock.");
        }
        Notice::CountdownTick { remaining } => {
            // Only nag near the end or on the half minute.
            if *remaining <= 5 || remaining % 30 == 0 {
                println!("  {remaining}s left");
            }
        }
        Notice::AnswerJudged {
            correct,
            delta,
            score,
        } => {
            if *correct {
                println!("Correct! {delta:+} points, score {score}.");
            } else {
                println!("Wrong. {delta:+} points, score {score}.");
            }
        }
        Notice::TimedOut { delta, score } => {
            println!("Time's up! {delta:+} points, score {score}.");
        }
        Notice::LifelineLost { remaining } => println!("Lifeline lost: {remaining} remaining."),
        Notice::BreachWarning { message } => println!("{message}"),
        Notice::RoundCleared { round, bonus, hint } => {
            println!("Round {round} cleared ({bonus:+} bonus).");
            println!("Next location: {hint}");
        }
        Notice::HuntFinished {
            score,
            lifeline_bonus,
            elapsed_secs,
        } => println!(
            "Hunt complete! Final score {score} ({lifeline_bonus:+} lifeline bonus) in {}.",
            format_time(*elapsed_secs)
        ),
        Notice::Eliminated { round } => {
            println!("Eliminated in round {round}. Type 'reset' to hand the device back.");
        }
        Notice::Revived { round, lifelines } => {
            println!("Revived! Back into round {round} with {lifelines} lifelines.");
        }
        Notice::RoundSkipped { round } => println!("The operator moved you to round {round}."),
        Notice::LifelinesAdjusted { lifelines } => println!("Lifelines set to {lifelines}."),
        Notice::ScoreAdjusted { score } => println!("Score set to {score}."),
        Notice::Signal(change) => render_signal(change),
        Notice::Effect(effect) => println!("[sfx] {}", effect_name(effect)),
        Notice::Standings(entries) => {
            println!("---- standings ----");
            for entry in entries {
                let time = entry
                    .time_secs
                    .map(|secs| format_time(secs.max(0) as u32))
                    .unwrap_or_else(|| "--:--".into());
                println!(
                    "{:>3}. {:<20} {:>6}  {}",
                    entry.rank, entry.username, entry.score, time
                );
            }
        }
        Notice::SessionReset => println!("Session wiped. Ready for the next participant."),
        Notice::ActionFailed { reason } => println!("! {reason}"),
    }
}

fn render_signal(change: &SignalChange) {
    match change {
        SignalChange::Paused(true) => println!("== GAME PAUSED by the operator =="),
        SignalChange::Paused(false) => println!("== game resumed =="),
        SignalChange::Blackout(true) => println!("== SCREEN BLACKOUT =="),
        SignalChange::Blackout(false) => println!("== blackout lifted =="),
        SignalChange::Sound(cue) => println!("[cue] {}", cue_name(cue)),
        SignalChange::Broadcast(Some(text)) => println!("[broadcast] {text}"),
        SignalChange::Broadcast(None) => println!("[broadcast cleared]"),
    }
}

fn effect_name(effect: &SoundEffect) -> &'static str {
    match effect {
        SoundEffect::Correct => "correct",
        SoundEffect::Wrong => "wrong",
        SoundEffect::Timeout => "timeout",
        SoundEffect::RoundClear => "round-clear",
        SoundEffect::Eliminated => "eliminated",
        SoundEffect::Victory => "victory",
    }
}

fn cue_name(cue: &SoundCue) -> String {
    match cue {
        SoundCue::Siren => "siren".into(),
        SoundCue::Laugh => "laugh".into(),
        SoundCue::Scare => "scare".into(),
        SoundCue::Airhorn => "airhorn".into(),
        SoundCue::Win => "win".into(),
        SoundCue::Other(code) => format!("cue {code}"),
    }
}

/// Feed stdin commands into the engine until EOF or `quit`.
async fn read_commands(handle: EngineHandle) {
    print_help();
    let mut lines = BufReader::new(io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(err) => {
                warn!(error = %err, "failed to read stdin");
                break;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match line {
            "quit" | "exit" => break,
            "help" => {
                print_help();
                continue;
            }
            _ => {}
        }
        match parse_action(line) {
            Ok(action) => {
                if !handle.act(action) {
                    break;
                }
            }
            Err(message) => println!("{message}"),
        }
    }
}

fn print_help() {
    println!("Commands:");
    println!("  register <username>   claim a name and start");
    println!("  resume <session-id>   pick up an existing run");
    println!("  scan <code>           present a code to the current gate");
    println!("  answer <a-d|1-4>      answer the live question");
    println!("  ok                    leave the hint screen");
    println!("  board                 show the standings");
    println!("  hide / show           report losing and regaining focus");
    println!("  reset                 wipe the session after a run ends");
    println!("  help                  print this again");
    println!("  quit                  exit");
}

/// Translate one stdin line into a player action.
fn parse_action(line: &str) -> Result<PlayerAction, String> {
    let line = line.trim();
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };
    match verb {
        "register" if !rest.is_empty() => Ok(PlayerAction::Register {
            username: rest.to_string(),
        }),
        "register" => Err("usage: register <username>".into()),
        "resume" => rest
            .parse::<Uuid>()
            .map(|participant_id| PlayerAction::Resume { participant_id })
            .map_err(|_| "usage: resume <session-id>".into()),
        "scan" if !rest.is_empty() => Ok(PlayerAction::ScanGate {
            code: rest.to_string(),
        }),
        "scan" => Err("usage: scan <code>".into()),
        "answer" => parse_option(rest).map(|option| PlayerAction::Answer { option }),
        "ok" => Ok(PlayerAction::AcknowledgeHint),
        "hide" => Ok(PlayerAction::Visibility(Visibility::Hidden)),
        "show" => Ok(PlayerAction::Visibility(Visibility::Visible)),
        "board" => Ok(PlayerAction::ShowStandings),
        "reset" => Ok(PlayerAction::Reset),
        other => Err(format!("unknown command '{other}' (try 'help')")),
    }
}

/// Accept either a letter (`a`..) or a 1-based number for an option.
fn parse_option(rest: &str) -> Result<usize, String> {
    let mut chars = rest.chars();
    if let (Some(letter), None) = (chars.next(), chars.next()) {
        if letter.is_ascii_alphabetic() {
            return Ok(letter.to_ascii_lowercase() as usize - 'a' as usize);
        }
    }
    rest.parse::<usize>()
        .ok()
        .and_then(|number| number.checked_sub(1))
        .ok_or_else(|| "usage: answer <a-d or 1-4>".into())
}

/// Wait for Ctrl+C or SIGTERM and shut the device down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letters_and_numbers_both_answer() {
        assert_eq!(
            parse_action("answer b").unwrap(),
            PlayerAction::Answer { option: 1 }
        );
        assert_eq!(
            parse_action("answer 3").unwrap(),
            PlayerAction::Answer { option: 2 }
        );
        assert_eq!(
            parse_action("answer D").unwrap(),
            PlayerAction::Answer { option: 3 }
        );
    }

    #[test]
    fn register_keeps_the_whole_name() {
        assert_eq!(
            parse_action("register neo cortex").unwrap(),
            PlayerAction::Register {
                username: "neo cortex".into()
            }
        );
    }

    #[test]
    fn scan_passes_the_code_through() {
        assert_eq!(
            parse_action("  scan glitch_protocol_start  ").unwrap(),
            PlayerAction::ScanGate {
                code: "glitch_protocol_start".into()
            }
        );
    }

    #[test]
    fn resume_requires_a_session_id() {
        assert!(parse_action("resume not-a-uuid").is_err());
        let id = Uuid::new_v4();
        assert_eq!(
            parse_action(&format!("resume {id}")).unwrap(),
            PlayerAction::Resume { participant_id: id }
        );
    }

    #[test]
    fn unknown_input_is_rejected() {
        assert!(parse_action("dance").is_err());
        assert!(parse_action("answer").is_err());
        assert!(parse_action("answer 0").is_err());
        assert!(parse_action("answer zz").is_err());
    }
}
