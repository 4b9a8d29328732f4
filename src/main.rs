use std::{
    collections::HashMap,
    error::Error,
    fs,
    io::{self, BufRead, BufReader},
    path::Path,
    sync::mpsc,
    thread,
    time::Duration,
};

use chrono::{Local, NaiveDateTime, NaiveTime, Timelike};
use clap::{command, Parser, Subcommand};
use log::{error, info, warn};
use ring_ring::{
    alarm::{Alarm, Day},
    communication::{Message, MessageType},
    config::{self, Settings},
    schedule::{countdown, next_occurrence, SNOOZE_MINUTES},
    AlarmStore, FireState,
};
use rodio::{source::SineWave, Decoder, OutputStream, OutputStreamHandle, Sink, Source};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// write default settings and an empty alarm list
    Init {
        #[clap(long, short)]
        force: bool,
    },
    /// add an alarm, e.g. `add 07:30 --days mon,tue --label work`
    Add {
        /// wall-clock trigger time, 24-hour HH:MM
        time: String,
        #[clap(long)]
        label: Option<String>,
        /// repeat weekly on these days; omit for a one-time alarm
        #[clap(long, value_delimiter = ',')]
        days: Vec<Day>,
        /// ringtone file name under the ringtones directory
        #[clap(long, default_value = "Default")]
        ringtone: String,
    },
    /// list alarms and the countdown to the next one
    List,
    Remove {
        id: u64,
    },
    Enable {
        id: u64,
    },
    Disable {
        id: u64,
    },
    /// set playback volume as a 0.0-1.0 fraction
    Volume {
        volume: f32,
    },
    /// run the scheduler; ring alarms and take stop/snooze commands on stdin
    Run,
}

fn main() -> Result<(), Box<dyn Error>> {
    // initilize the logger
    simple_file_logger::init_logger!("ring_ring").expect("couldn't initialize logger");

    let args = Args::parse();
    match args.command {
        Command::Init { force } => init(force),
        Command::Add {
            time,
            label,
            days,
            ringtone,
        } => add(&time, label, days, ringtone),
        Command::List => list(),
        Command::Remove { id } => remove(id),
        Command::Enable { id } => set_enabled(id, true),
        Command::Disable { id } => set_enabled(id, false),
        Command::Volume { volume } => set_volume(volume),
        Command::Run => run(),
    }
}

fn load_store() -> Result<AlarmStore, Box<dyn Error>> {
    Ok(AlarmStore::from_alarms(config::load_alarms(
        &config::alarms_path(),
    )?))
}

fn save_or_log(store: &AlarmStore) {
    // a failed save must never take the scheduler down with it
    if let Err(e) = config::save_alarms(store.all(), &config::alarms_path()) {
        error!("couldn't save alarms: {e}");
    }
}

fn init(force: bool) -> Result<(), Box<dyn Error>> {
    if config::is_present() && !force {
        println!("already initialized, pass --force to start over");
        return Ok(());
    }
    Settings::default().save(&config::settings_path())?;
    config::save_alarms(&[], &config::alarms_path())?;
    // custom ringtones dropped in here show up for `add --ringtone`
    fs::create_dir_all(config::ringtones_path())?;
    println!("wrote {}", config::settings_path().display());
    Ok(())
}

fn add(
    time: &str,
    label: Option<String>,
    days: Vec<Day>,
    ringtone: String,
) -> Result<(), Box<dyn Error>> {
    let time = NaiveTime::parse_from_str(time, "%H:%M")?;
    let (hour, minute) = (time.hour(), time.minute());
    let label = label.unwrap_or_else(|| format!("Alarm {hour:02}:{minute:02}"));
    let alarm = Alarm::new(hour, minute, label, days, ringtone, Local::now().naive_local())?;

    let mut store = load_store()?;
    let id = store.add(alarm);
    config::save_alarms(store.all(), &config::alarms_path())?;
    println!("added alarm {id}");
    Ok(())
}

fn list() -> Result<(), Box<dyn Error>> {
    let store = load_store()?;
    if store.is_empty() {
        println!("no alarms");
        return Ok(());
    }
    for alarm in store.iter() {
        let repeats = if alarm.is_recurring() {
            alarm
                .days
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        } else {
            "one-time".to_string()
        };
        println!(
            "{:>3}  {}  {}  [{repeats}]  {}{}",
            alarm.id,
            alarm.time().format("%I:%M %p"),
            alarm.label,
            alarm.ringtone,
            if alarm.enabled { "" } else { "  (off)" },
        );
    }
    let now = Local::now().naive_local();
    if let Some((at, alarm)) = next_occurrence(&store, now) {
        println!("next: {} in {}", alarm.label, countdown(at - now));
    }
    Ok(())
}

fn remove(id: u64) -> Result<(), Box<dyn Error>> {
    let mut store = load_store()?;
    if store.remove(id).is_some() {
        config::save_alarms(store.all(), &config::alarms_path())?;
        println!("removed alarm {id}");
    } else {
        eprintln!("no alarm {id}");
    }
    Ok(())
}

fn set_enabled(id: u64, enabled: bool) -> Result<(), Box<dyn Error>> {
    let mut store = load_store()?;
    if store.set_enabled(id, enabled) {
        config::save_alarms(store.all(), &config::alarms_path())?;
        println!("alarm {id} {}", if enabled { "enabled" } else { "disabled" });
    } else {
        eprintln!("no alarm {id}");
    }
    Ok(())
}

fn set_volume(volume: f32) -> Result<(), Box<dyn Error>> {
    let mut settings = Settings::load(&config::settings_path())?;
    settings.volume = volume.clamp(0.0, 1.0);
    settings.save(&config::settings_path())?;
    println!("volume {:.0}%", settings.volume * 100.0);
    Ok(())
}

/// intents from the interactive surface; they are applied only on the
/// poll loop thread, which is the single owner of the store and the
/// fire state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Intent {
    Stop(u64),
    Snooze(u64),
    Toggle(u64),
    Delete(u64),
    Quit,
}

fn parse_intent(line: &str) -> Option<Intent> {
    let mut words = line.split_whitespace();
    let command = words.next()?;
    let id = words.next();
    if words.next().is_some() {
        return None;
    }
    match (command, id) {
        ("quit" | "q", None) => Some(Intent::Quit),
        (command, Some(id)) => {
            let id = id.parse().ok()?;
            match command {
                "stop" => Some(Intent::Stop(id)),
                "snooze" => Some(Intent::Snooze(id)),
                "toggle" => Some(Intent::Toggle(id)),
                "delete" => Some(Intent::Delete(id)),
                _ => None,
            }
        }
        _ => None,
    }
}

fn read_intents(tx: &mpsc::Sender<Intent>) {
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match parse_intent(line) {
            Some(intent) => {
                let quit = matches!(intent, Intent::Quit);
                if tx.send(intent).is_err() || quit {
                    return;
                }
            }
            None => eprintln!("commands: stop <id> | snooze <id> | toggle <id> | delete <id> | quit"),
        }
    }
    // stdin closed, shut the loop down
    let _ = tx.send(Intent::Quit);
}

fn run() -> Result<(), Box<dyn Error>> {
    let settings = Settings::load(&config::settings_path())?;
    let mut store = load_store()?;
    let mut fire = FireState::new();
    info!("scheduler running with {} alarms", store.len());

    let (audio_tx, audio_rx) = mpsc::channel();
    thread::spawn(move || audio_loop(audio_rx));
    let (intent_tx, intent_rx) = mpsc::channel();
    thread::spawn(move || read_intents(&intent_tx));

    let mut ticks: u64 = 0;
    loop {
        let now = Local::now().naive_local();
        for alarm in fire.tick(&store, now) {
            info!("alarm {} ({}) triggered", alarm.id, alarm.label);
            println!(
                "⏰ {} — {}  (stop {} | snooze {})",
                alarm.time().format("%I:%M %p"),
                alarm.label,
                alarm.id,
                alarm.id,
            );
            let message = Message::new(
                MessageType::AlarmTriggered {
                    volume: settings.volume,
                    sound_path: config::ringtone_path(&alarm.ringtone),
                },
                alarm.id,
            );
            if audio_tx.send(message).is_err() {
                warn!("audio thread is gone");
            }
        }
        // the countdown only moves by the minute
        if ticks % 60 == 0 {
            if let Some((at, alarm)) = next_occurrence(&store, now) {
                info!("next: {} in {}", alarm.label, countdown(at - now));
            }
        }
        if drain_intents(&intent_rx, &mut store, &mut fire, now, &audio_tx) {
            save_or_log(&store);
            info!("scheduler stopping");
            return Ok(());
        }
        ticks += 1;
        thread::sleep(Duration::from_secs(1));
    }
}

/// applies every pending intent in arrival order; returns true when
/// the loop should stop (quit intent or the reader thread went away)
fn drain_intents(
    rx: &mpsc::Receiver<Intent>,
    store: &mut AlarmStore,
    fire: &mut FireState,
    now: NaiveDateTime,
    audio_tx: &mpsc::Sender<Message>,
) -> bool {
    loop {
        match rx.try_recv() {
            Ok(Intent::Quit) | Err(mpsc::TryRecvError::Disconnected) => return true,
            Ok(intent) => apply(intent, store, fire, now, audio_tx),
            Err(mpsc::TryRecvError::Empty) => return false,
        }
    }
}

fn apply(
    intent: Intent,
    store: &mut AlarmStore,
    fire: &mut FireState,
    now: NaiveDateTime,
    audio_tx: &mpsc::Sender<Message>,
) {
    match intent {
        Intent::Stop(id) => {
            if fire.stop(id) {
                send_stop(audio_tx, id);
                // a stopped one-time alarm would otherwise ring again
                // tomorrow at the same time; turn it off
                if store.get(id).is_some_and(|alarm| !alarm.is_recurring()) {
                    store.set_enabled(id, false);
                    save_or_log(store);
                }
                info!("alarm {id} stopped");
            } else {
                warn!("stop: alarm {id} is not ringing");
            }
        }
        Intent::Snooze(id) => {
            if fire.is_ringing(id) {
                send_stop(audio_tx, id);
            }
            match fire.snooze(store, id, now) {
                Some(snoozed) => {
                    info!("alarm {id} snoozed as {snoozed} for {SNOOZE_MINUTES} minutes");
                    save_or_log(store);
                }
                None => warn!("snooze: no alarm {id}"),
            }
        }
        Intent::Toggle(id) => {
            let Some(enabled) = store.get(id).map(|alarm| !alarm.enabled) else {
                warn!("toggle: no alarm {id}");
                return;
            };
            // disabling a ringing alarm also shuts it up
            if !enabled && fire.stop(id) {
                send_stop(audio_tx, id);
            }
            store.set_enabled(id, enabled);
            info!("alarm {id} {}", if enabled { "enabled" } else { "disabled" });
            save_or_log(store);
        }
        Intent::Delete(id) => {
            if fire.is_ringing(id) {
                send_stop(audio_tx, id);
            }
            fire.forget(id);
            match store.remove(id) {
                Some(_) => {
                    info!("alarm {id} deleted");
                    save_or_log(store);
                }
                None => warn!("delete: no alarm {id}"),
            }
        }
        // handled by the run loop before we get here
        Intent::Quit => {}
    }
}

fn send_stop(audio_tx: &mpsc::Sender<Message>, id: u64) {
    if audio_tx
        .send(Message::new(MessageType::AlarmStopped, id))
        .is_err()
    {
        warn!("audio thread is gone");
    }
}

fn audio_loop(rx: mpsc::Receiver<Message>) {
    let (_stream, handle) = match OutputStream::try_default() {
        Ok(output) => output,
        Err(e) => {
            error!("couldn't open audio output, alarms will be silent: {e}");
            // keep draining so the scheduler never notices
            for _message in rx {}
            return;
        }
    };
    let mut sinks: HashMap<u64, Sink> = HashMap::new();
    for message in rx {
        match message.kind {
            MessageType::AlarmTriggered { volume, sound_path } => {
                match play(&handle, volume, sound_path.as_deref()) {
                    Ok(sink) => {
                        sinks.insert(message.alarm_id, sink);
                    }
                    Err(e) => error!("couldn't play ringtone for alarm {}: {e}", message.alarm_id),
                }
            }
            MessageType::AlarmStopped => {
                if let Some(sink) = sinks.remove(&message.alarm_id) {
                    sink.stop();
                }
            }
        }
    }
}

fn play(handle: &OutputStreamHandle, volume: f32, sound: Option<&Path>) -> Result<Sink, Box<dyn Error>> {
    let sink = Sink::try_new(handle)?;
    sink.set_volume(volume);
    match sound {
        Some(path) => {
            let file = BufReader::new(fs::File::open(path)?);
            sink.append(Decoder::new(file)?.repeat_infinite());
        }
        None => {
            // built-in tone: half-second 1kHz beeps
            let beep = SineWave::new(1000.0)
                .take_duration(Duration::from_millis(500))
                .delay(Duration::from_millis(500));
            sink.append(beep.repeat_infinite());
        }
    }
    sink.play();
    Ok(sink)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intents_parse_from_stdin_lines() {
        assert_eq!(parse_intent("stop 3"), Some(Intent::Stop(3)));
        assert_eq!(parse_intent("  snooze 12 "), Some(Intent::Snooze(12)));
        assert_eq!(parse_intent("toggle 1"), Some(Intent::Toggle(1)));
        assert_eq!(parse_intent("delete 7"), Some(Intent::Delete(7)));
        assert_eq!(parse_intent("quit"), Some(Intent::Quit));
        assert_eq!(parse_intent("q"), Some(Intent::Quit));
    }

    #[test]
    fn malformed_intents_are_rejected() {
        assert_eq!(parse_intent("stop"), None);
        assert_eq!(parse_intent("stop x"), None);
        assert_eq!(parse_intent("stop 1 2"), None);
        assert_eq!(parse_intent("ring 1"), None);
        assert_eq!(parse_intent("quit 1"), None);
    }

    #[test]
    fn intent_drain_stops_on_quit_and_on_a_dead_reader() {
        let (intent_tx, intent_rx) = mpsc::channel();
        let (audio_tx, _audio_rx) = mpsc::channel();
        let mut store = AlarmStore::new();
        let mut fire = FireState::new();
        let now = chrono::NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();

        // nothing pending keeps the loop going
        assert!(!drain_intents(&intent_rx, &mut store, &mut fire, now, &audio_tx));

        // intents ahead of quit are still applied, then the loop stops
        intent_tx.send(Intent::Stop(1)).unwrap();
        intent_tx.send(Intent::Quit).unwrap();
        assert!(drain_intents(&intent_rx, &mut store, &mut fire, now, &audio_tx));

        // a vanished reader thread also stops the loop
        drop(intent_tx);
        assert!(drain_intents(&intent_rx, &mut store, &mut fire, now, &audio_tx));
    }
}
