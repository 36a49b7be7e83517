use console::style;
use nlgeo_core::error::NlgeoError;
use std::fmt;

/// Error with suggestions, shown to the user instead of a bare message
#[derive(Clone)]
pub struct CliError {
    pub message: String,
    pub context: Option<String>,
    pub suggestions: Vec<String>,
    pub help_command: Option<String>,
}

impl CliError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: None,
            suggestions: Vec::new(),
            help_command: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn with_help(mut self, command: impl Into<String>) -> Self {
        self.help_command = Some(command.into());
        self
    }

    pub fn display(&self) {
        eprintln!("{} {}\n", style("✗").red().bold(), style(&self.message).red().bold());

        if let Some(ref context) = self.context {
            eprintln!("{}", context);
            eprintln!();
        }

        if !self.suggestions.is_empty() {
            eprintln!("{}", style("To fix this:").yellow().bold());
            for (i, suggestion) in self.suggestions.iter().enumerate() {
                eprintln!("  {}. {}", i + 1, suggestion);
            }
            eprintln!();
        }

        if let Some(ref help_cmd) = self.help_command {
            eprintln!("{} {}", style("Need help?").cyan(), style(help_cmd).cyan().bold());
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Debug for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

/// The memory backend was selected without a places file
pub fn places_file_required(command: &str) -> CliError {
    CliError::new("No places file given")
        .with_context("The memory gazetteer is loaded from a GeoJSON file on every run.")
        .with_suggestion(format!("Pass one: nlgeo {} ... --places places.geojson", command))
        .with_suggestion("Or query the database: --storage postgres")
        .with_help(format!("Run: nlgeo {} --help", command))
}

/// A database command was run against the memory backend
pub fn postgres_required(command: &str) -> CliError {
    CliError::new(format!("'nlgeo {}' needs the PostgreSQL backend", command))
        .with_context("The memory gazetteer is read-only and lives for a single run.")
        .with_suggestion(format!("Run: nlgeo --storage postgres {}", command))
        .with_help("Run: nlgeo --help")
}

/// No database URL in any configuration layer
pub fn database_url_missing() -> CliError {
    CliError::new("No database URL configured")
        .with_suggestion("Set it: export NLGEO_DATABASE_URL=\"postgresql://localhost/nlgeo\"")
        .with_suggestion(
            "Or add to nlgeo.toml:\n  [database]\n  url = \"postgresql://localhost/nlgeo\"",
        )
        .with_suggestion("Or pass --database-url")
        .with_help("Run: nlgeo config")
}

/// Create error for database connection failure
pub fn database_connection_failed(error: &str) -> CliError {
    CliError::new("Cannot connect to PostgreSQL")
        .with_context(format!("The gazetteer database could not be reached.\n\nError: {}", error))
        .with_suggestion("Ensure PostgreSQL is running and the database exists")
        .with_suggestion("Check the URL shown by: nlgeo config")
        .with_suggestion("Install the postgis and pg_trgm extensions in that database")
        .with_help("Run: nlgeo db status")
}

/// A geocoding failure, with advice per error kind
pub fn from_nlgeo(error: &NlgeoError) -> CliError {
    let base = CliError::new(error.to_string());
    match error {
        NlgeoError::NotFound { .. } => base
            .with_suggestion("Check the spelling of the place name")
            .with_suggestion("Try a broader name or add a qualifier, e.g. \"Salem, Oregon\""),
        NlgeoError::Ambiguous { candidates, .. } => {
            let listed: Vec<String> = candidates
                .iter()
                .map(|c| {
                    let within: Vec<&str> = c.ancestors.iter().map(|a| a.name.as_str()).collect();
                    format!("  {} {} [{}] in {}", c.id, c.name, c.place_type, within.join(" > "))
                })
                .collect();
            base.with_context(format!("Candidates:\n{}", listed.join("\n")))
                .with_suggestion("Qualify the name with its region, e.g. \"Springfield, Illinois\"")
                .with_suggestion("Or give the node a place_type")
        }
        NlgeoError::BackendUnavailable { .. } => base
            .with_context("The gazetteer did not answer in time or refused the query.")
            .with_suggestion("This failure is temporary; retry the request")
            .with_suggestion("Raise the query timeout: --timeout-ms 10000")
            .with_help("Run: nlgeo db status"),
        NlgeoError::SchemaViolation { .. } => base
            .with_suggestion("Check the request tree against the node_type schema")
            .with_help("Run: nlgeo geocode --help"),
        NlgeoError::ConfigMissing { .. } | NlgeoError::ConfigInvalid { .. } => base
            .with_suggestion("Check nlgeo.toml and NLGEO_* environment variables")
            .with_help("Run: nlgeo config"),
        _ => base,
    }
}

/// Convert anyhow::Error to CliError with context
pub fn from_anyhow(error: anyhow::Error) -> CliError {
    if let Some(cli) = error.downcast_ref::<CliError>() {
        return cli.clone();
    }
    if let Some(nlgeo) = error.downcast_ref::<NlgeoError>() {
        return from_nlgeo(nlgeo);
    }

    let message = format!("{:#}", error);
    if message.contains("No such file or directory") {
        CliError::new("File not found")
            .with_context(format!("Error: {}", message))
            .with_suggestion("Check the file path and try again")
    } else if message.contains("Connection refused") || message.contains("could not connect") {
        database_connection_failed(&message)
    } else {
        CliError::new(message)
    }
}
