/// Integration tests for the search engines over a real SQLite database
#[cfg(test)]
mod tests {
    use movie_vec_search::catalog::Movie;
    use movie_vec_search::error::MovieSearchError;
    use movie_vec_search::search::{
        HybridSearch, MovieFilters, SemanticSearch, SortBy, SortOrder, StructuralRequest,
        StructuralSearch, MSG_EXACT, MSG_NONE, MSG_NONE_FILTERED, MSG_SIMILAR,
    };
    use movie_vec_search::storage::{register_vector_extension, MovieStore, VectorStore};
    use rusqlite::Connection;
    use std::path::Path;
    use tempfile::TempDir;

    const DIM: usize = 4;
    const THRESHOLD: f32 = 0.6;

    fn movie(name: &str, rating: f64, runtime: i64, genre: &str, plot: &str) -> Movie {
        Movie {
            id: None,
            name: name.to_string(),
            rating: Some(rating),
            runtime: Some(runtime),
            genre: Some(genre.to_string()),
            metascore: None,
            plot: Some(plot.to_string()),
            directors: None,
            stars: None,
            votes: None,
            gross: None,
            poster_url: None,
        }
    }

    fn fixture_movies() -> Vec<Movie> {
        vec![
            movie(
                "The Shawshank Redemption",
                9.3,
                142,
                "Drama",
                "Two imprisoned men bond over a number of years.",
            ),
            movie(
                "The Godfather",
                9.2,
                175,
                "Crime, Drama",
                "The aging patriarch of a crime dynasty transfers control to his son.",
            ),
            movie(
                "The Dark Knight",
                9.0,
                152,
                "Action, Crime, Drama",
                "Batman faces the Joker in Gotham City.",
            ),
            movie(
                "Inception",
                8.8,
                148,
                "Action, Adventure, Sci-Fi",
                "A thief steals corporate secrets through dream-sharing technology.",
            ),
            movie(
                "Forrest Gump",
                8.8,
                142,
                "Drama, Romance",
                "The presidencies unfold through the perspective of an Alabama man.",
            ),
        ]
    }

    /// Build a catalog of the five fixture movies and embed the first four
    /// with hand-made unit vectors. Forrest Gump (id 5) gets no embedding.
    fn fixture_db(dir: &Path) -> (MovieStore, VectorStore, Vec<i64>) {
        register_vector_extension();

        let db_path = dir.join("catalog.db");
        let mut store = MovieStore::new(&db_path).unwrap();
        let ids = store.replace_catalog(&fixture_movies()).unwrap();
        assert_eq!(ids.len(), 5);

        let vectors = VectorStore::new(Connection::open(&db_path).unwrap()).unwrap();
        vectors.ensure_table(DIM).unwrap();

        let embeddings: [[f32; DIM]; 4] = [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.6, 0.8, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
        ];
        for (id, embedding) in ids.iter().zip(embeddings.iter()) {
            vectors.insert_embedding(*id, embedding).unwrap();
        }

        (store, vectors, ids)
    }

    #[test]
    fn test_structural_filters_and_pagination() {
        let dir = TempDir::new().unwrap();
        let (store, _vectors, _ids) = fixture_db(dir.path());
        let engine = StructuralSearch::new(&store);

        let response = engine
            .search(&StructuralRequest {
                filters: MovieFilters {
                    min_rating: Some(9.0),
                    ..Default::default()
                },
                ..Default::default()
            })
            .unwrap();
        assert_eq!(response.total, 3);
        assert_eq!(response.results.len(), 3);
        assert!(!response.has_more);

        let response = engine
            .search(&StructuralRequest {
                filters: MovieFilters {
                    genre: Some("action".to_string()),
                    ..Default::default()
                },
                ..Default::default()
            })
            .unwrap();
        assert_eq!(response.total, 2);

        // total counts every match even when the page is smaller
        let response = engine
            .search(&StructuralRequest {
                limit: 2,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(response.total, 5);
        assert_eq!(response.results.len(), 2);
        assert!(response.has_more);

        let response = engine
            .search(&StructuralRequest {
                skip: 4,
                limit: 2,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(response.total, 5);
        assert_eq!(response.results.len(), 1);
        assert!(!response.has_more);
    }

    #[test]
    fn test_structural_sort_runtime_ascending() {
        let dir = TempDir::new().unwrap();
        let (store, _vectors, _ids) = fixture_db(dir.path());
        let engine = StructuralSearch::new(&store);

        let response = engine
            .search(&StructuralRequest {
                sort_by: SortBy::Runtime,
                sort_order: SortOrder::Asc,
                ..Default::default()
            })
            .unwrap();
        let runtimes: Vec<i64> = response
            .results
            .iter()
            .map(|m| m.runtime.unwrap())
            .collect();
        assert_eq!(runtimes, vec![142, 142, 148, 152, 175]);
    }

    #[test]
    fn test_genre_counts_split_from_compound_tags() {
        let dir = TempDir::new().unwrap();
        let (store, _vectors, _ids) = fixture_db(dir.path());
        let engine = StructuralSearch::new(&store);

        let genres = engine.list_genres().unwrap();
        assert_eq!(genres[0].name, "Drama");
        assert_eq!(genres[0].count, 4);

        let action = genres.iter().find(|g| g.name == "Action").unwrap();
        assert_eq!(action.count, 2);
        let crime = genres.iter().find(|g| g.name == "Crime").unwrap();
        assert_eq!(crime.count, 2);
    }

    #[test]
    fn test_catalog_stats_over_fixture() {
        let dir = TempDir::new().unwrap();
        let (store, _vectors, _ids) = fixture_db(dir.path());
        let engine = StructuralSearch::new(&store);

        let stats = engine.get_stats().unwrap();
        assert_eq!(stats.total_movies, 5);
        assert_eq!(stats.min_rating, 8.8);
        assert_eq!(stats.max_rating, 9.3);
        assert_eq!(stats.min_runtime, 142);
        assert_eq!(stats.max_runtime, 175);
    }

    #[test]
    fn test_semantic_exact_matches_and_ordering() {
        let dir = TempDir::new().unwrap();
        let (store, vectors, ids) = fixture_db(dir.path());
        let engine = SemanticSearch::new(&store, &vectors, THRESHOLD);

        // Aligned with Shawshank; Dark Knight sits exactly on the threshold.
        let response = engine
            .search_with_embedding(&[1.0, 0.0, 0.0, 0.0], 10)
            .unwrap();
        assert!(response.exact_matches);
        assert_eq!(response.message, MSG_EXACT);
        assert_eq!(response.results.len(), 4);

        assert_eq!(response.results[0].movie.id, Some(ids[0]));
        assert_eq!(response.results[0].similarity, Some(1.0));
        assert_eq!(response.results[1].movie.id, Some(ids[2]));
        assert_eq!(response.results[1].similarity, Some(0.6));

        // Scores never increase down the list
        let scores: Vec<f32> = response
            .results
            .iter()
            .map(|r| r.similarity.unwrap())
            .collect();
        assert!(scores.windows(2).all(|w| w[0] >= w[1]));

        // Forrest Gump has no embedding and never appears
        assert!(response.results.iter().all(|r| r.movie.id != Some(ids[4])));
    }

    #[test]
    fn test_semantic_similar_when_all_below_threshold() {
        let dir = TempDir::new().unwrap();
        let (store, vectors, _ids) = fixture_db(dir.path());
        let engine = SemanticSearch::new(&store, &vectors, THRESHOLD);

        // Orthogonal to every stored embedding
        let response = engine
            .search_with_embedding(&[0.0, 0.0, 0.0, 1.0], 10)
            .unwrap();
        assert!(!response.exact_matches);
        assert_eq!(response.message, MSG_SIMILAR);
        assert_eq!(response.results.len(), 4);
        assert!(response
            .results
            .iter()
            .all(|r| r.similarity.unwrap() < THRESHOLD));
    }

    #[test]
    fn test_semantic_none_when_catalog_unembedded() {
        register_vector_extension();
        let dir = TempDir::new().unwrap();

        let db_path = dir.path().join("empty.db");
        let mut store = MovieStore::new(&db_path).unwrap();
        store.replace_catalog(&fixture_movies()).unwrap();

        let vectors = VectorStore::new(Connection::open(&db_path).unwrap()).unwrap();
        vectors.ensure_table(DIM).unwrap();

        let engine = SemanticSearch::new(&store, &vectors, THRESHOLD);
        let response = engine
            .search_with_embedding(&[1.0, 0.0, 0.0, 0.0], 10)
            .unwrap();
        assert!(response.results.is_empty());
        assert!(!response.exact_matches);
        assert_eq!(response.message, MSG_NONE);
    }

    #[test]
    fn test_semantic_threshold_over_returned_set_only() {
        let dir = TempDir::new().unwrap();
        let (store, vectors, ids) = fixture_db(dir.path());
        let engine = SemanticSearch::new(&store, &vectors, THRESHOLD);

        // With limit 1 only the top match matters for the exact flag
        let response = engine
            .search_with_embedding(&[1.0, 0.0, 0.0, 0.0], 1)
            .unwrap();
        assert_eq!(response.results.len(), 1);
        assert_eq!(response.results[0].movie.id, Some(ids[0]));
        assert!(response.exact_matches);
        assert_eq!(response.message, MSG_EXACT);
    }

    #[test]
    fn test_semantic_rejects_limit_out_of_range() {
        let dir = TempDir::new().unwrap();
        let (store, vectors, _ids) = fixture_db(dir.path());
        let engine = SemanticSearch::new(&store, &vectors, THRESHOLD);

        let err = engine
            .search_with_embedding(&[1.0, 0.0, 0.0, 0.0], 0)
            .unwrap_err();
        assert!(matches!(err, MovieSearchError::InvalidArgument(_)));

        let err = engine
            .search_with_embedding(&[1.0, 0.0, 0.0, 0.0], 101)
            .unwrap_err();
        assert!(matches!(err, MovieSearchError::InvalidArgument(_)));
    }

    #[test]
    fn test_hybrid_filters_gate_the_ranking() {
        let dir = TempDir::new().unwrap();
        let (store, vectors, ids) = fixture_db(dir.path());
        let engine = HybridSearch::new(&store, &vectors, THRESHOLD);

        // Shawshank is the closest match overall but is not a Crime movie,
        // so the filter removes it no matter the similarity.
        let filters = MovieFilters {
            genre: Some("Crime".to_string()),
            ..Default::default()
        };
        let response = engine
            .search_with_embedding(&[1.0, 0.0, 0.0, 0.0], &filters, 10)
            .unwrap();
        assert_eq!(response.results.len(), 2);
        assert_eq!(response.results[0].movie.id, Some(ids[2]));
        assert_eq!(response.results[0].similarity, Some(0.6));
        assert_eq!(response.results[1].movie.id, Some(ids[1]));
        assert!(response.exact_matches);
        assert_eq!(response.message, MSG_EXACT);
    }

    #[test]
    fn test_hybrid_no_candidates_message() {
        let dir = TempDir::new().unwrap();
        let (store, vectors, _ids) = fixture_db(dir.path());
        let engine = HybridSearch::new(&store, &vectors, THRESHOLD);

        let filters = MovieFilters {
            genre: Some("Western".to_string()),
            ..Default::default()
        };
        let response = engine
            .search_with_embedding(&[1.0, 0.0, 0.0, 0.0], &filters, 10)
            .unwrap();
        assert!(response.results.is_empty());
        assert!(!response.exact_matches);
        assert_eq!(response.message, MSG_NONE_FILTERED);
    }

    #[test]
    fn test_hybrid_candidates_without_embeddings() {
        let dir = TempDir::new().unwrap();
        let (store, vectors, _ids) = fixture_db(dir.path());
        let engine = HybridSearch::new(&store, &vectors, THRESHOLD);

        // Forrest Gump matches the filter but has no embedding, so the
        // ranked set comes back empty.
        let filters = MovieFilters {
            genre: Some("Romance".to_string()),
            ..Default::default()
        };
        let response = engine
            .search_with_embedding(&[1.0, 0.0, 0.0, 0.0], &filters, 10)
            .unwrap();
        assert!(response.results.is_empty());
        assert_eq!(response.message, MSG_NONE_FILTERED);
    }

    #[test]
    fn test_hybrid_empty_filters_fall_back_to_full_catalog() {
        let dir = TempDir::new().unwrap();
        let (store, vectors, ids) = fixture_db(dir.path());
        let engine = HybridSearch::new(&store, &vectors, THRESHOLD);

        let response = engine
            .search_with_embedding(&[1.0, 0.0, 0.0, 0.0], &MovieFilters::default(), 10)
            .unwrap();
        assert_eq!(response.results.len(), 4);
        assert_eq!(response.results[0].movie.id, Some(ids[0]));
        assert!(response.exact_matches);
    }

    #[test]
    fn test_filtered_candidate_survives_deep_knn_rank() {
        register_vector_extension();
        let dir = TempDir::new().unwrap();
        let vectors = VectorStore::new(Connection::open(dir.path().join("vec.db")).unwrap()).unwrap();
        vectors.ensure_table(DIM).unwrap();

        // A crowd of near matches sits ahead of the single candidate in the
        // nearest-neighbor stream; the candidate itself is the worst match.
        for id in 1..=300 {
            vectors.insert_embedding(id, &[1.0, 0.0, 0.0, 0.0]).unwrap();
        }
        vectors.insert_embedding(301, &[0.0, 0.0, 0.0, 1.0]).unwrap();

        let results = vectors
            .search_similar_filtered(&[1.0, 0.0, 0.0, 0.0], &[301], 10)
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, 301);
        assert!(results[0].1 < 0.01);
    }

    #[test]
    fn test_zero_vectors_stay_out_of_the_index() {
        register_vector_extension();
        let dir = TempDir::new().unwrap();
        let vectors = VectorStore::new(Connection::open(dir.path().join("vec.db")).unwrap()).unwrap();
        vectors.ensure_table(DIM).unwrap();

        // A real plot at true cosine 0.2 to the query, and a blank plot's
        // zero vector. The zero vector must not rank (let alone rank first).
        let real = vec![0.2, 0.979_795_9, 0.0, 0.0];
        let stored = vectors
            .insert_embeddings(&[1, 2], &[real, vec![0.0; DIM]])
            .unwrap();
        assert_eq!(stored, 1);
        assert_eq!(vectors.embedded_ids().unwrap(), vec![1]);

        let results = vectors.search_similar(&[1.0, 0.0, 0.0, 0.0], 10).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, 1);
        assert!((results[0].1 - 0.2).abs() < 1e-3);
    }

    #[test]
    fn test_hybrid_rejects_invalid_filter_ranges() {
        let dir = TempDir::new().unwrap();
        let (store, vectors, _ids) = fixture_db(dir.path());
        let engine = HybridSearch::new(&store, &vectors, THRESHOLD);

        let filters = MovieFilters {
            min_rating: Some(11.0),
            ..Default::default()
        };
        let err = engine
            .search_with_embedding(&[1.0, 0.0, 0.0, 0.0], &filters, 10)
            .unwrap_err();
        assert!(matches!(err, MovieSearchError::InvalidArgument(_)));
    }
}
