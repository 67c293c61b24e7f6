use std::path::{Path, PathBuf};

mod terminal;

use circulation::{Config, Isbn, JsonStore, Library, MemberId};
use clap::ArgAction;
use terminal::Colorize;
use tracing::instrument;

/// Name of the configuration file looked up in the working directory.
const CONFIG_FILE: &str = "circulation.toml";

#[derive(Debug, clap::Parser)]
#[command(version, about)]
pub struct Cli {
    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to the snapshot file (overrides the configured data file)
    #[arg(short, long, global = true)]
    file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        Self::setup_logging(self.verbose);

        let ctx = Context::resolve(self.file);
        self.command
            .unwrap_or_else(|| Command::Stats(Stats::default()))
            .run(&ctx)
    }

    fn setup_logging(verbosity: u8) {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let level = match verbosity {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        };

        let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_thread_names(false)
            .with_line_number(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

/// Resolved runtime context: configuration plus the snapshot store.
#[derive(Debug)]
struct Context {
    config: Config,
    store: JsonStore,
}

impl Context {
    fn resolve(file: Option<PathBuf>) -> Self {
        let config = load_config(Path::new(CONFIG_FILE));
        let path = file.unwrap_or_else(|| config.data_file.clone());
        Self {
            config,
            store: JsonStore::new(path),
        }
    }

    /// Loads the snapshot, starting an empty library if none exists yet.
    fn library(&self) -> anyhow::Result<Library> {
        Ok(self.store.load_or_create(&self.config.name)?)
    }
}

fn load_config(path: &Path) -> Config {
    Config::load(path).unwrap_or_else(|e| {
        tracing::debug!("Failed to load config: {e}");
        Config::default()
    })
}

#[derive(Debug, clap::Parser)]
pub enum Command {
    /// Show catalog and membership statistics (default)
    Stats(Stats),

    /// Initialize a configuration file in the current directory
    Init(Init),

    /// Add copies of a title to the catalog
    Add(Add),

    /// Remove a title from the catalog
    Remove(Remove),

    /// Register a new member
    Register(Register),

    /// Check a title out to a member
    Borrow(Borrow),

    /// Return a borrowed title and assess any late fee
    Return(Return),

    /// List a member's outstanding loans
    Loans(Loans),

    /// Search the catalog by title or author
    Search(Search),

    /// List the whole catalog
    List(List),

    /// List registered members
    Members(Members),
}

impl Command {
    fn run(self, ctx: &Context) -> anyhow::Result<()> {
        match self {
            Self::Stats(command) => command.run(ctx)?,
            Self::Init(command) => command.run()?,
            Self::Add(command) => command.run(ctx)?,
            Self::Remove(command) => command.run(ctx)?,
            Self::Register(command) => command.run(ctx)?,
            Self::Borrow(command) => command.run(ctx)?,
            Self::Return(command) => command.run(ctx)?,
            Self::Loans(command) => command.run(ctx)?,
            Self::Search(command) => command.run(ctx)?,
            Self::List(command) => command.run(ctx)?,
            Self::Members(command) => command.run(ctx)?,
        }
        Ok(())
    }
}

#[derive(Debug, Default, clap::Parser)]
pub struct Stats {}

impl Stats {
    #[instrument(level = "debug", skip(self, ctx))]
    fn run(self, ctx: &Context) -> anyhow::Result<()> {
        let library = ctx.library()?;
        let stats = library.statistics();

        if stats.unique_titles == 0 && stats.members == 0 {
            println!("Nothing catalogued yet. Add a title with 'circ add'.");
            return Ok(());
        }

        println!("{}", library.name());
        println!();
        println!("Titles:");
        println!("  Unique titles: {}", stats.unique_titles);
        println!("  Total copies:  {}", stats.total_copies);
        println!("  Available:     {}", stats.available_copies);
        println!("  On loan:       {}", stats.copies_on_loan);
        println!();
        println!("Members:");
        println!("  Registered: {}", stats.members);
        println!("  Active:     {}", stats.active_members);

        if !stats.most_borrowed.is_empty() {
            println!();
            println!("Most borrowed:");
            for (rank, entry) in stats.most_borrowed.iter().enumerate() {
                println!(
                    "  {}. {} ({} times)",
                    rank + 1,
                    entry.title,
                    entry.times_borrowed
                );
            }
        }

        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
pub struct Init {
    /// Display name for the library
    #[arg(long, default_value = "Library")]
    name: String,
}

impl Init {
    #[instrument]
    fn run(self) -> anyhow::Result<()> {
        let path = Path::new(CONFIG_FILE);
        if path.exists() {
            anyhow::bail!("Already initialized (found existing {CONFIG_FILE})");
        }

        let config = Config {
            name: self.name,
            ..Config::default()
        };
        config
            .save(path)
            .map_err(|e| anyhow::anyhow!("Failed to create {CONFIG_FILE}: {e}"))?;

        println!("Initialized circulation manager");
        println!("  Created: {CONFIG_FILE}");
        println!();
        println!("Next steps:");
        println!("  circ add \"1984\" \"George Orwell\" 978-0451524935 --copies 3");

        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
pub struct Add {
    /// Title text
    title: String,

    /// Author text
    author: String,

    /// ISBN to file the copies under
    isbn: Isbn,

    /// How many copies to add
    #[arg(long, short, default_value_t = 1)]
    copies: u32,
}

impl Add {
    #[instrument(skip(ctx))]
    fn run(self, ctx: &Context) -> anyhow::Result<()> {
        let mut library = ctx.library()?;
        let outcome = library.add_title(&self.title, &self.author, &self.isbn, self.copies)?;
        ctx.store.save(&library)?;

        let book = library.book(&self.isbn).expect("entry was just added");
        if outcome.created {
            println!("{}", format!("Added {book}").success());
        } else {
            println!(
                "{}",
                format!("Added {} more copies: {book}", self.copies).success()
            );
        }
        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
pub struct Remove {
    /// ISBN of the title to remove
    isbn: Isbn,

    /// Skip confirmation prompts
    #[arg(long, short)]
    yes: bool,
}

impl Remove {
    #[instrument(skip(ctx))]
    fn run(self, ctx: &Context) -> anyhow::Result<()> {
        let mut library = ctx.library()?;
        let Some(book) = library.book(&self.isbn) else {
            anyhow::bail!("No title with ISBN {} in the catalog", self.isbn);
        };

        if !self.yes {
            println!("Will remove {book}");
            eprint!("\nProceed? (y/N) ");
            use std::io::{self, BufRead};
            let stdin = io::stdin();
            let mut line = String::new();
            stdin.lock().read_line(&mut line)?;
            if !line.trim().eq_ignore_ascii_case("y") {
                println!("Cancelled");
                std::process::exit(130);
            }
        }

        let removed = library.remove_title(&self.isbn)?;
        ctx.store.save(&library)?;

        println!(
            "{}",
            format!("Removed '{}' by {}", removed.title(), removed.author()).success()
        );
        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
pub struct Register {
    /// The member's name
    name: String,
}

impl Register {
    #[instrument(skip(ctx))]
    fn run(self, ctx: &Context) -> anyhow::Result<()> {
        let mut library = ctx.library()?;
        let id = library.register_member(&self.name)?;
        ctx.store.save(&library)?;

        let member = library.member(id).expect("member was just registered");
        println!(
            "{}",
            format!("Registered member #{id}: {}", member.name()).success()
        );
        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
pub struct Borrow {
    /// Id of the borrowing member
    member: MemberId,

    /// ISBN of the title to borrow
    isbn: Isbn,
}

impl Borrow {
    #[instrument(skip(ctx))]
    fn run(self, ctx: &Context) -> anyhow::Result<()> {
        let mut library = ctx.library()?;
        let loan = library.borrow(self.member, &self.isbn)?;
        ctx.store.save(&library)?;

        let book = library
            .book(&self.isbn)
            .expect("loan references a catalog entry");
        let member = library
            .member(self.member)
            .expect("loan references a member");
        println!(
            "{}",
            format!("{} borrowed '{}'", member.name(), book.title()).success()
        );
        println!("  Due: {}", loan.due.format("%Y-%m-%d"));
        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
pub struct Return {
    /// Id of the returning member
    member: MemberId,

    /// ISBN of the title being returned
    isbn: Isbn,
}

impl Return {
    #[instrument(skip(ctx))]
    fn run(self, ctx: &Context) -> anyhow::Result<()> {
        let mut library = ctx.library()?;
        let outcome = library.return_book(self.member, &self.isbn)?;
        ctx.store.save(&library)?;

        let book = library
            .book(&self.isbn)
            .expect("return went back into the catalog");
        println!("{}", format!("Returned '{}'", book.title()).success());
        if outcome.days_late > 0 {
            println!(
                "{}",
                format!(
                    "  {} day(s) late - fee owed: {}",
                    outcome.days_late, outcome.fee
                )
                .warning()
            );
        } else {
            println!("  Returned on time");
        }
        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
pub struct Loans {
    /// Id of the member
    member: MemberId,
}

impl Loans {
    #[instrument(level = "debug", skip(self, ctx))]
    fn run(self, ctx: &Context) -> anyhow::Result<()> {
        let library = ctx.library()?;
        let mut loans = library.outstanding_loans(self.member)?;
        let member = library
            .member(self.member)
            .expect("loans resolved for this member");

        if loans.is_empty() {
            println!("{} has nothing on loan", member.name());
            return Ok(());
        }

        // Soonest due first.
        loans.sort_by_key(|loan| loan.due);

        println!("{} has {} title(s) on loan:", member.name(), loans.len());
        for loan in &loans {
            let status = if loan.days_until_due < 0 {
                format!("OVERDUE by {} day(s)", -loan.days_until_due).warning()
            } else {
                format!("{} day(s) remaining", loan.days_until_due).dim()
            };
            println!(
                "  • {} [{}] - due {} ({status})",
                loan.title,
                loan.isbn,
                loan.due.format("%Y-%m-%d")
            );
        }
        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
pub struct Search {
    /// Case-insensitive substring matched against title and author;
    /// an empty query matches every entry
    #[arg(default_value = "")]
    query: String,
}

impl Search {
    #[instrument(level = "debug", skip(self, ctx))]
    fn run(self, ctx: &Context) -> anyhow::Result<()> {
        let library = ctx.library()?;
        let mut results: Vec<_> = library.search(&self.query).collect();

        if results.is_empty() {
            println!("No matches for '{}'", self.query);
            return Ok(());
        }

        // Search itself guarantees no order; sort alphabetically for display.
        results.sort_by_key(|book| book.title().to_lowercase());

        println!("{} match(es):", results.len());
        for book in results {
            println!("  • {book}");
        }
        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
pub struct List {
    /// Limit the number of rows shown
    #[arg(long)]
    limit: Option<usize>,
}

impl List {
    #[instrument(level = "debug", skip(self, ctx))]
    fn run(self, ctx: &Context) -> anyhow::Result<()> {
        let library = ctx.library()?;
        let mut books: Vec<_> = library.books().collect();

        if books.is_empty() {
            println!("The catalog is empty.");
            return Ok(());
        }

        books.sort_by_key(|book| book.title().to_lowercase());

        let total = books.len();
        let shown = self.limit.unwrap_or(total).min(total);
        let width = terminal::terminal_width().map_or(100, usize::from);

        for book in &books[..shown] {
            let line = format!("{:<16} {book}", book.isbn().as_str());
            println!("{}", truncate(line, width));
        }
        if shown < total {
            println!("{}", format!("... and {} more", total - shown).dim());
        }
        Ok(())
    }
}

/// Clips a line to the terminal width, marking the cut with an ellipsis.
fn truncate(line: String, width: usize) -> String {
    if line.chars().count() <= width {
        line
    } else {
        let mut clipped: String = line.chars().take(width.saturating_sub(1)).collect();
        clipped.push('…');
        clipped
    }
}

#[derive(Debug, Default, clap::Parser)]
pub struct Members {}

impl Members {
    #[instrument(level = "debug", skip(self, ctx))]
    fn run(self, ctx: &Context) -> anyhow::Result<()> {
        let library = ctx.library()?;

        if library.members().count() == 0 {
            println!("No members registered yet.");
            return Ok(());
        }

        for member in library.members() {
            println!(
                "  #{:<4} {} ({} on loan)",
                member.id().get(),
                member.name(),
                member.loan_count()
            );
        }
        Ok(())
    }
}
