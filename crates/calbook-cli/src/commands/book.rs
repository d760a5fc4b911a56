//! Calendar book commands for CLI.

use calbook_core::accounts::directory_for;
use calbook_core::book::STORE_TYPE_EVENT;
use calbook_core::{Book, BookDb, Books, Color, Config, LOCAL_ACCOUNT_ID};
use clap::Subcommand;
use uuid::Uuid;

#[derive(Subcommand)]
pub enum BookAction {
    /// List books
    List {
        /// Only books of this account
        #[arg(long, allow_hyphen_values = true)]
        account: Option<i32>,
        /// Print records as JSON
        #[arg(long)]
        json: bool,
    },
    /// Create a book in the local account
    Add {
        /// Book name
        name: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        location: Option<String>,
        /// Color as r.g.b.a
        #[arg(long)]
        color: Option<String>,
        /// 1 = events, 2 = todos
        #[arg(long, default_value_t = STORE_TYPE_EVENT)]
        store_type: i32,
        /// Create the book hidden
        #[arg(long)]
        hidden: bool,
    },
    /// Change a book
    Edit {
        /// Book ID
        id: i32,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        location: Option<String>,
        /// Color as r.g.b.a
        #[arg(long)]
        color: Option<String>,
        #[arg(long)]
        visible: Option<bool>,
    },
    /// Delete a book
    Rm {
        /// Book ID
        id: i32,
    },
    /// Reload books from the store
    Sync,
    /// Show sync status
    Status,
}

fn open_books() -> Result<Books<BookDb>, Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let path = config.database_path()?;
    tracing::debug!(path = %path.display(), "opening book store");
    let db = BookDb::open_at(&path)?;
    let mut books = Books::new(db, directory_for(config.sync.platform_accounts))
        .with_color_assignment(config.sync.assign_colors);
    books.initialize()?;
    Ok(books)
}

fn print_book(book: &Book) {
    let visibility = if book.visible() { "" } else { " (hidden)" };
    println!(
        "{}\t{}\t{}\t{}{}",
        book.id(),
        book.account_id(),
        book.color(),
        book.name(),
        visibility
    );
}

pub fn run(action: BookAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut books = open_books()?;

    match action {
        BookAction::List { account, json } => {
            let listed: Vec<&Book> = match account {
                Some(account_id) => books.get_books_by_account_id(account_id).unwrap_or_default(),
                None => books.iter().map(|(_, book)| book).collect(),
            };
            if json {
                let records: Vec<_> = listed.iter().map(|b| b.record()).collect();
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else {
                for book in listed {
                    print_book(book);
                }
            }
        }
        BookAction::Add {
            name,
            description,
            location,
            color,
            store_type,
            hidden,
        } => {
            if books.exist_name(LOCAL_ACCOUNT_ID, store_type, &name) {
                return Err(format!("a book named '{name}' already exists").into());
            }

            let mut book = Book::new();
            book.set_uid(Uuid::new_v4().to_string());
            book.set_name(name);
            book.set_store_type(store_type);
            book.set_visible(!hidden);
            if let Some(description) = description {
                book.set_description(description);
            }
            if let Some(location) = location {
                book.set_location(location);
            }
            if let Some(color) = color {
                book.set_color_rgb(Color::parse(&color));
            }

            books.ensure_account(LOCAL_ACCOUNT_ID);
            let key = books.insert_book(LOCAL_ACCOUNT_ID, &book)?;
            books.commit_to_db()?;
            if let Some(created) = books.get_book(key) {
                println!("Book created: {}", created.id());
            }
        }
        BookAction::Edit {
            id,
            name,
            description,
            location,
            color,
            visible,
        } => {
            let mut book = books
                .get_book_by_id(id)
                .cloned()
                .ok_or_else(|| format!("no book with id {id}"))?;
            if let Some(name) = name {
                book.set_name(name);
            }
            if let Some(description) = description {
                book.set_description(description);
            }
            if let Some(location) = location {
                book.set_location(location);
            }
            if let Some(color) = color {
                book.set_color_rgb(Color::parse(&color));
            }
            if let Some(visible) = visible {
                book.set_visible(visible);
            }

            if books.update_book(&book)? {
                books.commit_to_db()?;
                println!("Book updated: {id}");
            } else {
                println!("Book unchanged: {id}");
            }
        }
        BookAction::Rm { id } => {
            books.delete_book(id)?;
            books.commit_to_db()?;
            println!("Book deleted: {id}");
        }
        BookAction::Sync => {
            let report = books.update_from_db()?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        BookAction::Status => {
            println!("{}", serde_json::to_string_pretty(&books.status())?);
        }
    }
    Ok(())
}
