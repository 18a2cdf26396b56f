mod config;

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand, ValueEnum};
use client::{Comment, CommentList, Page, Server, SortCriterion, SortDirection};
use dotenvy::dotenv;
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::Settings;

#[derive(Parser)]
#[command(name = "isso-comments", about = "Browse and write comments on an isso comment server")]
struct Cli {
    /// Base URL of the comment server; overrides `server.base_url`.
    #[arg(long, global = true)]
    server: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the comment tree of a page.
    List {
        uri: String,
        #[arg(long, value_enum, default_value_t = SortArg::Creation)]
        sort: SortArg,
        /// Sort in descending order.
        #[arg(long)]
        desc: bool,
    },
    /// Print the number of comments of each page, asked in a single request.
    Count {
        #[arg(required = true)]
        uris: Vec<String>,
    },
    /// Write a new comment.
    Post {
        uri: String,
        #[arg(long)]
        text: String,
        #[arg(long)]
        author: Option<String>,
        #[arg(long)]
        website: Option<String>,
        #[arg(long)]
        email: Option<String>,
        /// ID of the comment to reply to.
        #[arg(long)]
        reply_to: Option<u64>,
    },
    Like {
        uri: String,
        id: u64,
    },
    Dislike {
        uri: String,
        id: u64,
    },
    /// Delete a comment. Only works from the session that wrote it.
    Delete {
        uri: String,
        id: u64,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SortArg {
    Creation,
    Modification,
    Likes,
    Dislikes,
    LikeSum,
}

impl From<SortArg> for SortCriterion {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Creation => SortCriterion::Creation,
            SortArg::Modification => SortCriterion::Modification,
            SortArg::Likes => SortCriterion::Likes,
            SortArg::Dislikes => SortCriterion::Dislikes,
            SortArg::LikeSum => SortCriterion::LikeSum,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let cli = Cli::parse();
    let settings = Settings::new().context("Failed to load configuration")?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log.filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut http = settings.http_config();
    if let Some(base_url) = cli.server {
        http.base_url = base_url;
    }
    info!("Using comment server at {}", http.base_url);
    let server = Server::http(http).context("Failed to set up the HTTP client")?;

    match cli.command {
        Command::List { uri, sort, desc } => {
            let page = server.page(&uri);
            page.comments()
                .fetch()
                .await
                .with_context(|| format!("Failed to load comments of {}", page.uri()))?;
            let direction = if desc {
                SortDirection::Descending
            } else {
                SortDirection::Ascending
            };
            print_tree(page.comments(), sort.into(), direction, 0);
            println!(
                "{} comments, {} including replies",
                page.comments().count(),
                page.comments().deep_count()
            );
        }
        Command::Count { uris } => {
            let pages: Vec<Page> = uris.iter().map(|uri| server.page(uri)).collect();
            let counts = futures::future::try_join_all(
                pages.iter().map(|page| page.comments().fetch_deep_count()),
            )
            .await
            .context("Failed to count comments")?;
            for (page, count) in pages.iter().zip(counts) {
                println!("{}\t{}", page.uri(), count);
            }
        }
        Command::Post {
            uri,
            text,
            author,
            website,
            email,
            reply_to,
        } => {
            let page = server.page(&uri);
            let comment = match reply_to {
                Some(id) => Comment::new(&find(&page, id).await?),
                None => Comment::new(&page),
            };
            comment.set_raw_text(Some(text));
            comment.author().set_name(author);
            comment.author().set_website(website);
            comment.author().set_email(email);
            comment.send().await.context("Failed to send the comment")?;

            let id = comment.id().unwrap_or_default();
            if comment.awaits_moderation() {
                println!("Comment #{} is awaiting moderation", id);
            } else {
                println!("Published comment #{}", id);
            }
        }
        Command::Like { uri, id } => {
            let comment = find(&server.page(&uri), id).await?;
            let likes = comment.send_like().await.context("Failed to like")?;
            println!("#{} now has {} likes", id, likes);
        }
        Command::Dislike { uri, id } => {
            let comment = find(&server.page(&uri), id).await?;
            let dislikes = comment.send_dislike().await.context("Failed to dislike")?;
            println!("#{} now has {} dislikes", id, dislikes);
        }
        Command::Delete { uri, id } => {
            let comment = find(&server.page(&uri), id).await?;
            comment.delete().await.context("Failed to delete")?;
            println!("Deleted #{}", id);
        }
    }

    Ok(())
}

/// Loads the page and looks for `id` anywhere in its tree.
async fn find(page: &Page, id: u64) -> anyhow::Result<Comment> {
    page.comments()
        .fetch()
        .await
        .with_context(|| format!("Failed to load comments of {}", page.uri()))?;
    page.comments()
        .flat_map(Comment::clone)
        .into_iter()
        .find(|c| c.id() == Some(id))
        .ok_or_else(|| anyhow!("No comment #{} on {}", id, page.uri()))
}

fn print_tree(list: &CommentList, criterion: SortCriterion, direction: SortDirection, depth: usize) {
    list.sort_by(criterion, direction);
    for comment in list.entries() {
        let author = comment.author().name().unwrap_or_else(|| "Anonymous".into());
        let mut flags = String::new();
        if comment.deleted() {
            flags.push_str(" [deleted]");
        }
        if comment.awaits_moderation() {
            flags.push_str(" [pending]");
        }
        println!(
            "{:indent$}#{} {} (+{}/-{}){}",
            "",
            comment.id().unwrap_or_default(),
            author,
            comment.likes(),
            comment.dislikes(),
            flags,
            indent = depth * 2
        );
        if let Some(text) = comment.text() {
            for line in text.lines().filter(|l| !l.trim().is_empty()) {
                println!("{:indent$}  {}", "", line.trim(), indent = depth * 2);
            }
        }
        print_tree(comment.replies(), criterion, direction, depth + 1);
    }
}
