use camino::Utf8PathBuf;
use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use schema_guard::config::DEFAULT_CONFIG_PATH;
use schema_guard::dsn::DEFAULT_DSN;
use schema_guard::output::OutputFormatter;
use schema_guard::{
    BackupMethod, Config, Dsn, ExecuteOptions, Executor, MySqlDatabase, SchemaGuardError,
    SystemRunner, Validator,
};
use std::fs;
use std::process::exit;

const CONFIG_TEMPLATE: &str = include_str!("../schema-guard.toml.example");

#[derive(Parser)]
#[command(name = "schema-guard")]
#[command(version, about = "Validate and safely apply MySQL/MariaDB ALTER TABLE changes", long_about = None)]
struct Cli {
    /// Agent configuration file
    #[arg(long, global = true, env = "RELEEM_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: Utf8PathBuf,

    /// Connection string, user:password@tcp(host:port)/database
    #[arg(long, global = true, env = "MYSQL_DSN", default_value = DEFAULT_DSN, hide_env_values = true, hide_default_value = true)]
    dsn: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Check ALTER TABLE statements against the server without changing anything
    Validate {
        /// ALTER TABLE statements
        ddl: Vec<String>,

        /// Read additional statements from a SQL file
        #[arg(long)]
        file: Option<Utf8PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// Apply one ALTER TABLE statement, optionally taking a backup first
    Execute {
        /// ALTER TABLE statement
        sql: String,

        /// Backup to take before the change
        #[arg(value_enum, default_value_t = BackupMethod::None)]
        backup_method: BackupMethod,

        /// Use pt-online-schema-change instead of online DDL
        #[arg(value_parser = BoolishValueParser::new(), action = ArgAction::Set, default_value = "false")]
        use_ptosc: bool,

        /// Log commands (credentials masked) and tool output
        #[arg(short, long)]
        debug: bool,
    },

    /// Write a configuration template
    Init {
        /// Where to write the template
        #[arg(long, default_value = "schema-guard.toml")]
        path: Utf8PathBuf,

        /// Overwrite existing config file if it exists
        #[arg(long)]
        force: bool,
    },
}

fn init_logging(debug: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if debug {
        builder.filter_level(LevelFilter::Debug);
    }
    builder.init();
}

fn connect(dsn: &str) -> Result<(Dsn, MySqlDatabase), SchemaGuardError> {
    let dsn = Dsn::parse(dsn)?;
    let db = MySqlDatabase::connect(&dsn)?;
    Ok((dsn, db))
}

fn validate(
    cli_dsn: &str,
    ddl: Vec<String>,
    file: Option<Utf8PathBuf>,
    format: Format,
) -> Result<(), SchemaGuardError> {
    let validator = Validator::new();

    let mut statements = ddl;
    if let Some(path) = file {
        statements.extend(validator.statements_from_file(&path)?);
    }
    if statements.is_empty() {
        return Err(SchemaGuardError::parse_error(
            "no statements given; pass ALTER TABLE statements or --file",
        ));
    }

    let (_, mut db) = connect(cli_dsn)?;
    let result = validator.validate_statements(&mut db, &statements)?;

    match format {
        Format::Json => println!("{}", OutputFormatter::format_json(&result)),
        Format::Text => print!("{}", OutputFormatter::format_validation(&result)),
    }

    Ok(())
}

fn execute(
    config_path: &Utf8PathBuf,
    cli_dsn: &str,
    sql: String,
    backup_method: BackupMethod,
    use_ptosc: bool,
    debug: bool,
) -> Result<(), SchemaGuardError> {
    let config = Config::load_or_default(config_path);
    let (dsn, mut db) = connect(cli_dsn)?;

    let options = ExecuteOptions {
        sql,
        table_name: None,
        dsn: Some(dsn),
        backup_method,
        use_ptosc,
        config,
        debug,
    };

    let result = Executor::new(&mut db, &SystemRunner).execute(&options)?;
    print!("{}", OutputFormatter::format_execution(&result));

    Ok(())
}

fn init(path: &Utf8PathBuf, force: bool) {
    // Check if config file already exists
    let file_existed = path.exists();
    if file_existed && !force {
        eprintln!("Error: {} already exists", path);
        eprintln!("Use --force to overwrite the existing file");
        exit(1);
    }

    match fs::write(path, CONFIG_TEMPLATE) {
        Ok(_) => {
            if file_existed {
                println!("✓ Overwrote {}", path);
            } else {
                println!("✓ Created {}", path);
            }
            println!();
            println!("Next steps:");
            println!("1. Edit {} with your MySQL credentials and tool paths", path);
            println!("2. Point RELEEM_CONFIG (or --config) at it");
            println!("3. Run 'schema-guard validate \"ALTER TABLE ...\"' before executing a change");
        }
        Err(e) => {
            eprintln!("Error: Failed to write config file: {}", e);
            exit(1);
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let debug = matches!(cli.command, Commands::Execute { debug: true, .. });
    init_logging(debug);

    let outcome = match cli.command {
        Commands::Validate { ddl, file, format } => validate(&cli.dsn, ddl, file, format),

        Commands::Execute {
            sql,
            backup_method,
            use_ptosc,
            debug,
        } => execute(&cli.config, &cli.dsn, sql, backup_method, use_ptosc, debug),

        Commands::Init { path, force } => {
            init(&path, force);
            Ok(())
        }
    };

    if let Err(e) = outcome {
        eprintln!("{:?}", miette::Report::new(e));
        exit(1);
    }
}
