use clap::Parser;
use tlcompare::report::TracingReporter;
use tlcompare::{get_schema, Thresholds};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(clap::Subcommand)]
enum Commands {
    /// Compare two transmission-loss data files
    Compare {
        /// First input file
        file1: String,
        /// Second input file
        file2: String,
        /// Minimum absolute difference classed as significant (0 = maximum sensitivity)
        #[clap(long, default_value_t = 0.05)]
        significant: f64,
        /// Absolute difference above which the comparison fails fatally
        #[clap(long, default_value_t = 10.0)]
        critical: f64,
        /// Minimum difference emitted into the difference table
        #[clap(long, default_value_t = 1.0)]
        print: f64,
        /// Fractional significance threshold (enables percent mode), e.g. 0.01 for 1%
        #[clap(long)]
        percent: Option<f64>,
    },

    /// Export the JsonSchema for the threshold configuration
    Schema,
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Arguments {
    #[clap(short, long)]
    /// print debug information about the run
    verbose: bool,
    #[clap(subcommand)]
    /// choose the command to run
    command: Commands,
}

fn main() {
    let args = Arguments::parse();
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };

    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    match args.command {
        Commands::Schema => {
            println!("{}", get_schema());
            std::process::exit(0);
        }
        Commands::Compare {
            file1,
            file2,
            significant,
            critical,
            print,
            percent,
        } => {
            let mut thresholds = Thresholds::new(significant, critical, print);
            if let Some(percent) = percent {
                thresholds = thresholds.with_percent_mode(percent);
            }

            let mut reporter = TracingReporter::new();
            match tlcompare::compare_paths(&file1, &file2, thresholds, &mut reporter) {
                Ok(summary) => {
                    print!("{}", reporter.table);
                    if summary.success {
                        std::process::exit(0);
                    } else {
                        std::process::exit(1);
                    }
                }
                Err(err) => {
                    eprintln!("{err}");
                    std::process::exit(1);
                }
            }
        }
    };
}
