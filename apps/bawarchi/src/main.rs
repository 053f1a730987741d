use std::{fs, path::PathBuf, sync::Arc};

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use recipe_core::{
    image_data_url, parse_tags, save_recipe, search_recipe, CommandNarrator, CommunityClient,
    CommunityPublisher, LogNarrator, Narrator, PostDraft, RecipeSourceClient,
};
use shared::domain::{Recipe, UserProfile};
use storage::{RecipeSlot, Storage};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use url::Url;

mod config;
mod cook;
mod render;

use config::{load_settings, prepare_database_url, Settings};

#[derive(Parser, Debug)]
#[command(name = "bawarchi", about = "Generate recipes and cook them step by step")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ask the recipe service for a recipe.
    Search {
        #[arg(required = true)]
        prompt: Vec<String>,
        /// Save the result under this name, replacing the saved recipe.
        #[arg(long)]
        save: Option<String>,
    },
    /// Print the saved recipe.
    Show,
    /// Walk through the saved recipe with step timers.
    Cook,
    /// List the saved recipe's ingredients, or change quantities.
    Ingredients {
        /// `name=quantity`; may be repeated.
        #[arg(long = "set", value_parser = parse_assignment)]
        updates: Vec<(String, String)>,
    },
    /// Share the saved recipe on the community feed.
    Publish {
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        /// Comma separated.
        #[arg(long, default_value = "")]
        tags: String,
        /// Local image file to embed; may be repeated.
        #[arg(long = "image")]
        images: Vec<PathBuf>,
        /// Already hosted image; may be repeated.
        #[arg(long = "image-url")]
        image_urls: Vec<String>,
        /// Redirect URL from the sign-in flow, carrying the profile.
        #[arg(long)]
        redirect: Url,
    },
    /// Forget the saved recipe.
    Clear,
}

fn parse_assignment(raw: &str) -> Result<(String, String), String> {
    let (name, quantity) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected name=quantity, got '{raw}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err("ingredient name must not be empty".to_string());
    }
    Ok((name.to_string(), quantity.trim().to_string()))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let settings = load_settings();
    let database_url = prepare_database_url(&settings.database_url)?;
    let storage = Storage::new(&database_url).await.map_err(|error| {
        error!(
            %database_url,
            %error,
            "failed to open recipe database; verify parent directory exists and permissions are correct"
        );
        error
    })?;

    match args.command {
        Command::Search { prompt, save } => {
            let source = RecipeSourceClient::new(settings.recipe_endpoint()?);
            let recipe = search_recipe(&source, &prompt.join(" ")).await?;
            render::print_recipe(&recipe);
            if let Some(name) = save {
                save_found_recipe(&storage, &recipe, &name).await;
            }
        }
        Command::Show => match storage.load().await? {
            Some(record) => render::print_record(&record),
            None => println!("No saved recipe."),
        },
        Command::Cook => {
            let record = storage.load().await?.context("no saved recipe to cook")?;
            info!(recipe_name = %record.name, "starting cook-along");
            cook::run(record.recipe, narrator(&settings)).await?;
        }
        Command::Ingredients { updates } => {
            let mut record = storage.load().await?.context("no saved recipe")?;
            if updates.is_empty() {
                render::print_ingredients(&record.recipe);
                return Ok(());
            }
            for (name, quantity) in &updates {
                let changed = record.recipe.update_ingredient(name, quantity);
                if changed == 0 {
                    println!("'{name}' is not in this recipe.");
                }
            }
            save_recipe(&storage, &record.recipe, &record.name, Utc::now()).await?;
            render::print_ingredients(&record.recipe);
        }
        Command::Publish {
            title,
            description,
            tags,
            images,
            image_urls,
            redirect,
        } => {
            let record = storage.load().await?.context("no saved recipe to publish")?;
            let Some(profile) = UserProfile::from_redirect(&redirect) else {
                bail!("the redirect URL carries no signed-in profile");
            };

            let mut embedded = image_urls;
            for path in &images {
                let bytes = fs::read(path)
                    .with_context(|| format!("failed to read image '{}'", path.display()))?;
                let mime = mime_guess::from_path(path).first_or_octet_stream();
                embedded.push(image_data_url(mime.essence_str(), &bytes));
            }

            let draft = PostDraft {
                title,
                description,
                images: embedded,
                tags: parse_tags(&tags),
            };
            let request = draft.into_request(&profile.email, &record.recipe, Utc::now())?;
            CommunityClient::new(settings.community_endpoint()?)
                .publish(&request)
                .await?;
            println!("Published '{}' as {}.", request.post.title, profile.name);
        }
        Command::Clear => {
            storage.clear().await?;
            println!("Saved recipe cleared.");
        }
    }

    Ok(())
}

/// The recipe is already on screen, so a failed save is reported but does not
/// fail the search.
async fn save_found_recipe(slot: &dyn RecipeSlot, recipe: &Recipe, name: &str) -> bool {
    match save_recipe(slot, recipe, name, Utc::now()).await {
        Ok(record) => {
            println!("Saved as '{}'.", record.name);
            true
        }
        Err(error) => {
            warn!(%error, "failed to save recipe");
            eprintln!("Could not save recipe: {error}");
            false
        }
    }
}

fn narrator(settings: &Settings) -> Arc<dyn Narrator> {
    match settings
        .narration_command
        .as_deref()
        .and_then(CommandNarrator::from_command_line)
    {
        Some(command) => {
            info!(program = command.program(), "narrating through external command");
            Arc::new(command)
        }
        None => Arc::new(LogNarrator),
    }
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
