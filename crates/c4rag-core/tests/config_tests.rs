use figment::providers::{Format, Serialized, Toml};
use figment::{Figment, Jail};
use std::path::Path;

use c4rag_core::config::{
    EmbeddingBackend, IndexBackend, RetrievalStrategy, Settings, SimilarityMetric,
};
use c4rag_core::Error;

fn settings_from(toml: &str) -> Result<Settings, Error> {
    Settings::from_figment(Figment::from(Serialized::defaults(Settings::default())).merge(Toml::string(toml)))
}

#[test]
fn defaults_are_valid() {
    let s = Settings::default();
    s.validate().expect("defaults validate");
    assert_eq!(s.index.metric, SimilarityMetric::Cosine);
    assert_eq!(s.index.backend, IndexBackend::BruteForce);
    assert_eq!(s.embedding.backend, EmbeddingBackend::Hash);
    assert_eq!(s.experiment.bootstrap_count, 0);
}

#[test]
fn toml_overrides_nested_sections() {
    let s = settings_from(
        r#"
        [chunking]
        chunk_size = 200
        overlap = 50

        [index]
        metric = "inner_product"
        backend = "ivf"
        [index.ivf]
        nlist = 16

        [retrieval]
        strategy = "hybrid"
        top_k = 10
        "#,
    )
    .expect("valid settings");
    assert_eq!(s.chunking.chunk_size, 200);
    assert_eq!(s.chunking.overlap, 50);
    assert_eq!(s.index.metric, SimilarityMetric::InnerProduct);
    assert_eq!(s.index.backend, IndexBackend::Ivf);
    assert_eq!(s.index.ivf.nlist, 16);
    assert_eq!(s.index.ivf.nprobe, 8, "unset fields keep their defaults");
    assert_eq!(s.retrieval.strategy, RetrievalStrategy::Hybrid);
    assert_eq!(s.retrieval.top_k, 10);
}

#[test]
fn invalid_values_are_rejected_before_work_starts() {
    let cases = [
        "[chunking]\nchunk_size = 100\noverlap = 100",
        "[embedding]\ndimension = 0",
        "[embedding]\nbackend = \"bge\"",
        "[embedding]\nmax_failure_rate = 1.5",
        "[retrieval]\ntop_k = 0",
        "[index]\nbackend = \"ivf\"\n[index.ivf]\nnprobe = 0",
        "[index]\ndimension = 128",
        "[index]\nmetric = \"euclid\"",
    ];
    for case in cases {
        assert!(matches!(settings_from(case), Err(Error::InvalidConfig(_))), "accepted: {case}");
    }
}

#[test]
fn strategy_parses_from_cli_text() {
    assert_eq!("BM25".parse::<RetrievalStrategy>().unwrap(), RetrievalStrategy::Bm25);
    assert_eq!("baseline".parse::<RetrievalStrategy>().unwrap(), RetrievalStrategy::Random);
    assert!("fancy".parse::<RetrievalStrategy>().is_err());
    assert_eq!(RetrievalStrategy::Tri.to_string(), "tri");
}

#[test]
fn expand_path_handles_env_vars() {
    Jail::expect_with(|jail| {
        jail.set_env("STORE_ROOT", "/srv/c4rag");
        let p = c4rag_core::config::expand_path("${STORE_ROOT}/store");
        assert_eq!(p, std::path::PathBuf::from("/srv/c4rag/store"));
        Ok(())
    });
}

#[test]
fn env_vars_override_config_toml() {
    Jail::expect_with(|jail| {
        jail.set_env("RUST_ENV", "dev");
        jail.create_file("config.toml", "[chunking]\nchunk_size = 200\noverlap = 20\n[retrieval]\ntop_k = 7")?;
        jail.create_file("config.dev.toml", "[retrieval]\ntop_k = 9")?;
        jail.set_env("C4RAG_CHUNKING__CHUNK_SIZE", "300");

        let s = Settings::load().map_err(|e| e.to_string())?;
        assert_eq!(s.chunking.chunk_size, 300);
        assert_eq!(s.chunking.overlap, 20);
        assert_eq!(s.retrieval.top_k, 9, "environment file beats config.toml");
        Ok(())
    });
}

#[test]
fn explicit_file_overrides_env_vars() {
    Jail::expect_with(|jail| {
        jail.set_env("C4RAG_CHUNKING__CHUNK_SIZE", "300");
        jail.set_env("C4RAG_RETRIEVAL__STRATEGY", "bm25");
        jail.create_file("run.toml", "[chunking]\nchunk_size = 400")?;

        let s = Settings::load_with(Some(Path::new("run.toml"))).map_err(|e| e.to_string())?;
        assert_eq!(s.chunking.chunk_size, 400);
        assert_eq!(s.retrieval.strategy, RetrievalStrategy::Bm25);
        Ok(())
    });
}

#[test]
fn missing_explicit_file_is_invalid_config() {
    Jail::expect_with(|_jail| {
        let err = Settings::load_with(Some(Path::new("absent.toml"))).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(ref m) if m.contains("absent.toml")), "{err}");
        Ok(())
    });
}
