//! End-to-end tests for asset reconciliation
//!
//! Builds small sites in temporary directories and runs the rename and
//! rewrite passes over them.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use asset_reconcile::config::{FuzzyConfig, RewriteConfig};
use asset_reconcile::corpus::Corpus;
use asset_reconcile::fuzzy::similarity;
use asset_reconcile::pass::{rename_pass, rewrite_pass};
use asset_reconcile::{
    normalize, AssetStore, CollisionPolicy, Decision, DirectoryStore, MappingBuilder,
    NameNormalizer, ReferenceRewriter, Ruleset,
};

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

fn rewriter() -> ReferenceRewriter {
    ReferenceRewriter::new("images", FuzzyConfig::default(), &RewriteConfig::default()).unwrap()
}

// =============================================================================
// Normalization properties
// =============================================================================

#[test]
fn test_documented_normalizations() {
    assert_eq!(normalize("Foo-Bar_1Foo-Bar.png"), "foo-bar.png");
    assert_eq!(
        normalize("365cf3adf1b8ced6ecc57c70b839f820_Hero_Banner.png"),
        "hero-banner.png"
    );
    assert_eq!(normalize("IMAGE.PNG"), "image.png");
}

#[test]
fn test_normalize_idempotent_over_generated_names() {
    let pieces = ["Foo", "_1", "-", "__", " ", "Bar", "1", "é", "(2)", "365cf3adf1b8ced6ecc57c70b839f820_"];
    let exts = ["", ".PNG", ".jpg", ".Tar.Gz"];
    let normalizer = NameNormalizer::new(Ruleset::V2);

    for a in pieces {
        for b in pieces {
            for c in pieces {
                for ext in exts {
                    let name = format!("{}{}{}{}", a, b, c, ext);
                    let once = normalizer.normalize(&name);
                    assert_eq!(normalizer.normalize(&once), once, "input {:?}", name);
                }
            }
        }
    }
}

// =============================================================================
// Mapping and collisions
// =============================================================================

#[test]
fn test_skip_and_warn_pass_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let images = dir.path().join("images");
    for name in ["Team_Photo.JPG", "Logo.png", "logo_.png", "ok.svg"] {
        write(&images, name, name);
    }

    let mut store = DirectoryStore::open(&images).unwrap();
    let outcome = rename_pass(&mut store, Ruleset::V2, CollisionPolicy::SkipAndWarn, false).unwrap();

    let names: Vec<String> = store.list().unwrap().into_iter().collect();
    assert_eq!(names, vec!["Logo.png", "logo_.png", "ok.svg", "team-photo.jpg"]);
    assert_eq!(outcome.applied.unresolved.len(), 1);
    assert!(outcome.applied.deleted.is_empty());

    // every surviving non-collision name is already canonical
    let normalizer = NameNormalizer::default();
    let colliding = outcome.report.colliding_originals();
    for name in names.iter().filter(|n| !colliding.contains(n.as_str())) {
        assert_eq!(&normalizer.normalize(name), name);
    }
}

#[test]
fn test_delete_duplicates_pass_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let images = dir.path().join("images");
    write(&images, "hero.png", "kept");
    write(&images, "Hero_1Hero.png", "dup");

    let mut store = DirectoryStore::open(&images).unwrap();
    let outcome = rename_pass(&mut store, Ruleset::V2, CollisionPolicy::DeleteDuplicates, false).unwrap();

    assert_eq!(
        outcome.decisions,
        vec![Decision::Delete {
            file: "Hero_1Hero.png".to_string(),
            survivor: "hero.png".to_string(),
            canonical: "hero.png".to_string(),
        }]
    );
    assert_eq!(fs::read_to_string(images.join("hero.png")).unwrap(), "kept");
    assert!(!images.join("Hero_1Hero.png").exists());
}

#[test]
fn test_dry_run_changes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let images = dir.path().join("images");
    write(&images, "Big Banner.PNG", "x");

    let mut store = DirectoryStore::open(&images).unwrap();
    let outcome = rename_pass(&mut store, Ruleset::V2, CollisionPolicy::SkipAndWarn, true).unwrap();

    assert_eq!(outcome.applied.renamed.len(), 1);
    assert!(images.join("Big Banner.PNG").exists());
}

#[test]
fn test_v1_mapping_leaves_nested_duplicates() {
    let report = MappingBuilder::with_ruleset(Ruleset::V1).build(["x_1x_1x.png"]);
    assert_eq!(report.mapping["x_1x_1x.png"], "x-1x.png");
    let report = MappingBuilder::with_ruleset(Ruleset::V2).build(["x_1x_1x.png"]);
    assert_eq!(report.mapping["x_1x_1x.png"], "x.png");
}

// =============================================================================
// Fuzzy resolution and rewriting
// =============================================================================

#[test]
fn test_similarity_symmetry() {
    let words = ["aboutusimage1", "herobanner", "banner", "zzz", "teamphoto2024"];
    for a in words {
        for b in words {
            assert_eq!(similarity(a, b), similarity(b, a));
        }
    }
}

#[test]
fn test_duplicated_reference_fixed_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "images/about-us-image-1.avif", "img");
    write(
        root,
        "about.html",
        r#"<img src="images/About-Us---Image-1_1About-Us---Image-1.avif" alt="">"#,
    );

    let store = DirectoryStore::open(root.join("images")).unwrap();
    let assets = store.list().unwrap();
    let corpus = Corpus::new(root, &["html".to_string()]);
    let outcome = rewrite_pass(&corpus, &rewriter(), &BTreeMap::new(), &assets, false);

    assert_eq!(
        fs::read_to_string(root.join("about.html")).unwrap(),
        r#"<img src="images/about-us-image-1.avif" alt="">"#
    );
    assert!(outcome.unresolved.is_empty());
    assert_eq!(outcome.totals.fixed_by_fuzzy, 1);
}

#[test]
fn test_full_run_is_safe_to_repeat() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "images/Case_Study_Hero.WEBP", "a");
    write(root, "images/photo-500.jpg", "b");
    write(
        root,
        "index.html",
        r#"<img src="images/Case_Study_Hero.WEBP" srcset="images/photo-500.jpg 500w, images/photo-500w">"#,
    );
    write(
        root,
        "case-studies/one.html",
        r#"<img src="../images/Case_Study_Hero.WEBP">"#,
    );

    let corpus = Corpus::new(root, &["html".to_string()]);
    let images = root.join("images");

    for _ in 0..2 {
        let mut store = DirectoryStore::open(&images).unwrap();
        let renamed = rename_pass(&mut store, Ruleset::V2, CollisionPolicy::SkipAndWarn, false).unwrap();
        let assets = store.list().unwrap();
        let outcome = rewrite_pass(
            &corpus,
            &rewriter(),
            &renamed.applied.applied_mapping(),
            &assets,
            false,
        );
        assert!(outcome.failures.is_empty());
        assert!(outcome.unresolved.is_empty());
    }

    assert_eq!(
        fs::read_to_string(root.join("index.html")).unwrap(),
        r#"<img src="images/case-study-hero.webp" srcset="images/photo-500.jpg 500w, images/photo-500w">"#
    );
    assert_eq!(
        fs::read_to_string(root.join("case-studies/one.html")).unwrap(),
        r#"<img src="../images/case-study-hero.webp">"#
    );
}

#[test]
fn test_renamed_assets_followed_through_css_and_query_references() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "images/Hero_Banner.png", "a");
    write(
        root,
        "index.html",
        r#"<div style="background:url(images/Hero_Banner.png)"></div><img src="images/Hero_Banner.png?v=2" srcset="images/Hero_Banner.png, images/Hero_Banner.png 2x">"#,
    );

    let mut store = DirectoryStore::open(root.join("images")).unwrap();
    let renamed = rename_pass(&mut store, Ruleset::V2, CollisionPolicy::SkipAndWarn, false).unwrap();
    let assets = store.list().unwrap();
    let corpus = Corpus::new(root, &["html".to_string()]);
    let outcome = rewrite_pass(&corpus, &rewriter(), &renamed.applied.applied_mapping(), &assets, false);

    assert!(outcome.unresolved.is_empty());
    assert_eq!(outcome.totals.fixed_by_mapping, 4);
    assert_eq!(
        fs::read_to_string(root.join("index.html")).unwrap(),
        r#"<div style="background:url(images/hero-banner.png)"></div><img src="images/hero-banner.png?v=2" srcset="images/hero-banner.png, images/hero-banner.png 2x">"#
    );
}
