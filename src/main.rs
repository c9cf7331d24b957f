use std::env;
use std::io::{self, Write};
use std::process;

use tracing_subscriber::EnvFilter;

fn init_logging() {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(io::stderr)
    .without_time()
    .init();
}

fn main() {
  init_logging();

  let args: Vec<String> = env::args().collect();
  if args.len() != 2 {
    let program = args.first().map(String::as_str).unwrap_or("rtcc");
    eprintln!("usage: {program} <source>");
    process::exit(1);
  }

  let stdout = io::stdout();
  let mut out = io::BufWriter::new(stdout.lock());
  let result = rtcc::compile(&args[1], &mut out);
  // Keep whatever was emitted before a failure.
  let _ = out.flush();

  if let Err(err) = result {
    eprintln!("{err}");
    process::exit(1);
  }
}
