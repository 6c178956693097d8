use clap::Parser as ClapParser;
use ringbuffer_log_event::{
    Config, Error, EventValues, Level, LogRecord, Location, Marker, RingBufferLogEvent,
    SimpleMessage, Throwable,
};
use std::{fs, io, path::PathBuf, sync::Arc};
use tracing::error;

/// Writes a few populated slots to a file, then reads them back
#[derive(Debug, clap::Parser)]
struct Opts {
    /// The slot configuration yaml file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// The event stream file to write and read back
    pub stream: PathBuf,

    /// Number of events to write
    #[arg(long, default_value_t = 3)]
    pub count: usize,
}

fn main() {
    tracing_subscriber::fmt::init();

    let opts = Opts::parse();

    let cfg = match opts.config.as_ref() {
        Some(p) => Config::from_yaml(fs::read_to_string(p).unwrap()).unwrap(),
        None => Config::default(),
    };

    let mut slot = RingBufferLogEvent::with_config(&cfg);
    let mut out = io::BufWriter::new(fs::File::create(&opts.stream).unwrap());
    for idx in 0..opts.count {
        slot.set_values(EventValues {
            logger_name: Some(internment::Intern::new("demo".to_owned())),
            marker: Some(Marker::new("DEMO")),
            level: Some(Level::Info),
            message: Some(Arc::new(SimpleMessage::new(format!("event {idx}")))),
            thrown: (idx == 0).then(|| Throwable::new(io::Error::other("first event failed"))),
            source: Some(Location::caller(module_path!())),
            time_millis: idx as i64,
            ..Default::default()
        });
        slot.write_to(&mut out).unwrap();
    }
    drop(out);

    let mut stream = fs::File::open(&opts.stream).unwrap();
    loop {
        let evt = match RingBufferLogEvent::read_from(&mut stream) {
            Ok(e) => e,
            Err(Error::Io(e)) if e.kind() == io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(e) => {
                error!("{e}");
                break;
            }
        };

        println!(
            "{} [{}] {}",
            evt.time_millis(),
            evt.level(),
            evt.message().formatted_message()
        );
        if let Some(proxy) = evt.thrown_proxy() {
            println!("{proxy}");
        }
    }
}
