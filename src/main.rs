use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};

use lantern::config::{ConfigError, SiteConfig};
use lantern::db::{connection, posts, tags, SqliteStore};
use lantern::models::{CreatePostInput, PostFilter};
use lantern::search::reading_time::{format_reading_time, reading_time_minutes};
use lantern::SearchEngine;

#[derive(Parser)]
#[command(
    name = "lantern",
    about = "Blog post store with ranked full-text search",
    version
)]
struct Cli {
    /// Path to the SQLite database
    #[arg(long, global = true, default_value = "blog.db")]
    db: PathBuf,

    /// Path to the site config YAML (defaults apply when omitted)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search posts and static pages
    Search {
        /// Query text
        query: String,

        /// Include unpublished posts
        #[arg(long)]
        all: bool,

        /// Print the raw response as JSON
        #[arg(long)]
        json: bool,
    },

    /// Add a new post, content from a file or stdin
    Add {
        /// Post title
        #[arg(short, long)]
        title: String,

        /// Slug, derived from the title when omitted
        #[arg(long)]
        slug: Option<String>,

        /// Short description shown in listings
        #[arg(short, long)]
        description: Option<String>,

        /// Tag name, repeatable
        #[arg(long = "tag")]
        tags: Vec<String>,

        /// Publish immediately instead of saving a draft
        #[arg(long)]
        published: bool,

        /// Pin to the top of listings
        #[arg(long)]
        pinned: bool,

        /// Read content from this markdown file instead of stdin
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// List posts
    List {
        /// Only published posts
        #[arg(long)]
        published: bool,

        /// Only drafts
        #[arg(long, conflicts_with = "published")]
        drafts: bool,

        /// Filter by tag slug
        #[arg(long)]
        tag: Option<String>,

        /// Case-insensitive substring filter
        #[arg(long)]
        search: Option<String>,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// List tags
    Tags {
        /// Normalize tag names and merge duplicates
        #[arg(long)]
        cleanup: bool,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Rebuild the full-text index from the posts table
    Reindex,
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("error: {}", e);
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let pool = connection::init_pool_at_path(&cli.db)?;

    match cli.command {
        Commands::Search { query, all, json } => {
            let config = load_config(cli.config.as_deref())?;
            let engine = SearchEngine::new(SqliteStore::new(pool), &config);
            let response = engine.search(&query, !all).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&response)?);
                return Ok(());
            }

            if response.posts.is_empty() && response.pages.is_empty() {
                println!("no matches");
                return Ok(());
            }

            for hit in &response.posts {
                println!("{}  [{}]", hit.title, hit.slug);
                for snippet in &hit.snippets {
                    println!("    {}", snippet);
                }
            }
            for page in &response.pages {
                println!("{}  [{}]", page.title, page.path);
                for snippet in &page.snippets {
                    println!("    {}", snippet);
                }
            }
        }

        Commands::Add {
            title,
            slug,
            description,
            tags,
            published,
            pinned,
            file,
        } => {
            let content = match file {
                Some(path) => fs::read_to_string(&path)?,
                None => {
                    let mut buf = String::new();
                    std::io::stdin().read_to_string(&mut buf)?;
                    buf
                }
            };

            let conn = pool.get()?;
            let post = posts::create_post(
                &conn,
                CreatePostInput {
                    title,
                    slug,
                    description,
                    content,
                    published,
                    pinned,
                    tags,
                },
            )?;

            println!(
                "created {}  [{}]  {}",
                post.slug,
                post.id,
                format_reading_time(reading_time_minutes(&post.content))
            );
        }

        Commands::List {
            published,
            drafts,
            tag,
            search,
            json,
        } => {
            let filter = PostFilter {
                published: if published {
                    Some(true)
                } else if drafts {
                    Some(false)
                } else {
                    None
                },
                tag_slug: tag,
                search,
            };

            let conn = pool.get()?;
            let posts = posts::list_posts(&conn, &filter)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&posts)?);
                return Ok(());
            }

            for post in &posts {
                let mut flags = String::new();
                if post.pinned {
                    flags.push_str(" [pinned]");
                }
                if !post.published {
                    flags.push_str(" [draft]");
                }
                println!(
                    "{}  [{}]{}  {}",
                    post.title,
                    post.slug,
                    flags,
                    format_reading_time(reading_time_minutes(&post.content))
                );
                if !post.tags.is_empty() {
                    let names: Vec<&str> = post.tags.iter().map(|t| t.name.as_str()).collect();
                    println!("    tags: {}", names.join(", "));
                }
            }
        }

        Commands::Tags { cleanup, json } => {
            let conn = pool.get()?;

            if cleanup {
                let cleaned = tags::cleanup_tags(&conn)?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&cleaned)?);
                } else if cleaned.is_empty() {
                    println!("nothing to clean");
                } else {
                    for change in &cleaned {
                        if change.merged {
                            println!("merged {:?} into {:?}", change.old_name, change.new_name);
                        } else {
                            println!("renamed {:?} to {:?}", change.old_name, change.new_name);
                        }
                    }
                }
                return Ok(());
            }

            let all = tags::get_all_tags(&conn)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&all)?);
            } else {
                for tag in &all {
                    println!("{}  [{}]", tag.name, tag.slug);
                }
            }
        }

        Commands::Reindex => {
            let conn = pool.get()?;
            posts::rebuild_search_index(&conn)?;
            println!("search index rebuilt");
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<SiteConfig, ConfigError> {
    match path {
        Some(p) => SiteConfig::load(p),
        None => Ok(SiteConfig::default()),
    }
}
