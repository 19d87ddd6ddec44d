use clap::{Parser, Subcommand};
use movie_vec_search::api::MovieSearchApi;
use movie_vec_search::config::{Config, ModelType};
use movie_vec_search::error::Result;
use movie_vec_search::search::{
    MovieFilters, SemanticResponse, SortBy, SortOrder, StructuralRequest,
};
use movie_vec_search::storage::register_vector_extension;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "movie-search")]
#[command(about = "Movie Catalog Vector Search Tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Database file path
    #[arg(short, long, default_value = "movie_search.db")]
    db: PathBuf,
}

#[derive(clap::Args, Debug, Default)]
struct FilterArgs {
    /// Filter by genre (partial match)
    #[arg(long)]
    genre: Option<String>,

    /// Filter by director name (partial match)
    #[arg(long)]
    directors: Option<String>,

    /// Filter by actor name (partial match)
    #[arg(long)]
    stars: Option<String>,

    /// Minimum rating (0-10)
    #[arg(long)]
    min_rating: Option<f64>,

    /// Maximum rating (0-10)
    #[arg(long)]
    max_rating: Option<f64>,

    /// Minimum runtime in minutes
    #[arg(long)]
    min_runtime: Option<i64>,

    /// Maximum runtime in minutes
    #[arg(long)]
    max_runtime: Option<i64>,
}

impl FilterArgs {
    fn into_filters(self, name: Option<String>) -> MovieFilters {
        MovieFilters {
            name,
            genre: self.genre,
            directors: self.directors,
            stars: self.stars,
            min_rating: self.min_rating,
            max_rating: self.max_rating,
            min_runtime: self.min_runtime,
            max_runtime: self.max_runtime,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest the movie catalog from a processed CSV file
    Ingest {
        /// Path to the catalog CSV
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Build plot embeddings for ingested movies
    BuildEmbeddings {
        /// Custom model directory (default: local models/ dir, then hf-hub)
        #[arg(long)]
        model: Option<PathBuf>,

        /// Custom tokenizer file path
        #[arg(long)]
        tokenizer: Option<PathBuf>,

        /// Embedding model type
        #[arg(long, value_enum, default_value = "minilm")]
        model_type: ModelType,

        /// Force full rebuild (drop all embeddings and regenerate)
        #[arg(long)]
        rebuild: bool,
    },

    /// Structural search: attribute filters, sorting, pagination
    Search {
        /// Substring match on movie name
        query: Option<String>,

        #[command(flatten)]
        filters: FilterArgs,

        /// Field to sort by
        #[arg(long, value_enum, default_value = "rating")]
        sort_by: SortBy,

        /// Sort order
        #[arg(long, value_enum, default_value = "desc")]
        sort_order: SortOrder,

        /// Number of results to skip
        #[arg(long, default_value = "0")]
        skip: usize,

        /// Number of results to return
        #[arg(short = 'n', long, default_value = "10")]
        limit: usize,

        /// Print the response as JSON
        #[arg(long)]
        json: bool,
    },

    /// Semantic search: rank movie plots against a natural-language query
    Semantic {
        /// Natural-language query, e.g. "prison escape and friendship"
        query: String,

        /// Number of results to return
        #[arg(short = 'n', long, default_value = "10")]
        limit: usize,

        /// Embedding model type
        #[arg(long, value_enum, default_value = "minilm")]
        model_type: ModelType,

        /// Print the response as JSON
        #[arg(long)]
        json: bool,
    },

    /// Hybrid search: structural filters, then semantic ranking
    Hybrid {
        /// Natural-language query
        query: String,

        /// Substring match on movie name
        #[arg(long)]
        name: Option<String>,

        #[command(flatten)]
        filters: FilterArgs,

        /// Number of results to return
        #[arg(short = 'n', long, default_value = "10")]
        limit: usize,

        /// Embedding model type
        #[arg(long, value_enum, default_value = "minilm")]
        model_type: ModelType,

        /// Print the response as JSON
        #[arg(long)]
        json: bool,
    },

    /// List all genres with movie counts
    Genres {
        /// Print the response as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show catalog statistics (rating/runtime bounds, movie count)
    Stats {
        /// Print the response as JSON
        #[arg(long)]
        json: bool,
    },
}

fn print_semantic_response(response: &SemanticResponse, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(response)?);
        return Ok(());
    }

    println!("\n{}\n", response.message);
    for ranked in &response.results {
        let movie = &ranked.movie;
        let score = ranked.similarity.unwrap_or(0.0);
        println!("{}  (similarity: {:.4})", movie.name, score);
        if let Some(rating) = movie.rating {
            println!("   Rating: {}", rating);
        }
        if let Some(ref genre) = movie.genre {
            println!("   Genre: {}", genre);
        }
        if let Some(ref plot) = movie.plot {
            let short = if plot.chars().count() > 200 {
                format!("{}...", plot.chars().take(200).collect::<String>())
            } else {
                plot.clone()
            };
            println!("   Plot: {}", short);
        }
        println!();
    }
    Ok(())
}


fn main() -> Result<()> {
    // Register sqlite-vec for every connection before anything touches the DB
    register_vector_extension();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::filter::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::filter::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = Config::new(cli.db);

    match cli.command {
        Commands::Ingest { file } => {
            let _span = tracing::info_span!("ingest", file = %file.display()).entered();
            info!("Ingesting movie catalog");
            let mut api = MovieSearchApi::new(config)?;
            let count = api.ingest_csv(&file)?;
            info!(count, "Successfully ingested movies");
            println!("Ingested {} movies", count);
        }

        Commands::BuildEmbeddings {
            model,
            tokenizer,
            model_type,
            rebuild,
        } => {
            let _span = tracing::info_span!("build_embeddings", rebuild).entered();
            info!("Building plot embeddings");

            let mut config = config.with_model_type(model_type);
            config.model_path = model;
            config.tokenizer_path = tokenizer;

            let api = MovieSearchApi::new(config)?;
            let count = api.build_embeddings(rebuild)?;
            info!(count, "Successfully built embeddings");
            println!("Built embeddings for {} movies", count);
        }

        Commands::Search {
            query,
            filters,
            sort_by,
            sort_order,
            skip,
            limit,
            json,
        } => {
            let _span = tracing::info_span!("search", skip, limit).entered();

            let api = MovieSearchApi::new(config)?;
            let request = StructuralRequest {
                filters: filters.into_filters(query),
                sort_by,
                sort_order,
                skip,
                limit,
            };
            let response = api.structural_search(&request)?;

            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&response)?
                );
            } else {
                println!(
                    "\nShowing {} of {} matching movies (skip {}):\n",
                    response.results.len(),
                    response.total,
                    response.skip
                );
                for movie in &response.results {
                    let rating = movie
                        .rating
                        .map(|r| format!("{:.1}", r))
                        .unwrap_or_else(|| "-".to_string());
                    let runtime = movie
                        .runtime
                        .map(|r| format!("{} min", r))
                        .unwrap_or_else(|| "-".to_string());
                    println!(
                        "{}  [rating {} | {} | {}]",
                        movie.name,
                        rating,
                        runtime,
                        movie.genre.as_deref().unwrap_or("-")
                    );
                }
                if response.has_more {
                    println!("\n...more results available (use --skip)");
                }
            }
        }

        Commands::Semantic {
            query,
            limit,
            model_type,
            json,
        } => {
            let _span = tracing::info_span!("semantic", query = %query, limit).entered();

            let config = config.with_model_type(model_type);
            let api = MovieSearchApi::new(config)?;
            let response = api.semantic_search(&query, limit)?;
            print_semantic_response(&response, json)?;
        }

        Commands::Hybrid {
            query,
            name,
            filters,
            limit,
            model_type,
            json,
        } => {
            let _span = tracing::info_span!("hybrid", query = %query, limit).entered();

            let config = config.with_model_type(model_type);
            let api = MovieSearchApi::new(config)?;
            let response = api.hybrid_search(&query, &filters.into_filters(name), limit)?;
            print_semantic_response(&response, json)?;
        }

        Commands::Genres { json } => {
            let _span = tracing::info_span!("genres").entered();
            let api = MovieSearchApi::new(config)?;
            let genres = api.list_genres()?;

            if json {
                println!("{}", serde_json::to_string_pretty(&genres)?);
            } else {
                println!("\n{:<24} {:>8}", "Genre", "Movies");
                println!("{}", "-".repeat(33));
                for genre in genres {
                    println!("{:<24} {:>8}", genre.name, genre.count);
                }
            }
        }

        Commands::Stats { json } => {
            let _span = tracing::info_span!("stats").entered();
            let api = MovieSearchApi::new(config)?;
            let stats = api.get_stats()?;

            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("Catalog Statistics:");
                println!("  Total movies: {}", stats.total_movies);
                println!("  Rating range: {:.1} - {:.1}", stats.min_rating, stats.max_rating);
                println!(
                    "  Runtime range: {} - {} min",
                    stats.min_runtime, stats.max_runtime
                );
            }
        }
    }

    Ok(())
}
