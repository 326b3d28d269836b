//! Tests for running command lines against a configuration root

use assert_matches::assert_matches;
use pkgflags_config::{
    parse_actions, ConfigError, FlagCache, Namespace, PackageFiles, StaticMetadata, Verbatim,
};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn metadata() -> StaticMetadata {
    StaticMetadata::new()
        .with_global(Namespace::Use, ["doc", "ssl", "x"])
        .with_global(Namespace::Keywords, ["amd64", "x86"])
        .with_package(Namespace::Use, "dev-libs/foo", ["+ssl", "doc", "x"])
        .with_package(Namespace::Keywords, "dev-libs/foo", ["~amd64", "x"])
        .with_package(Namespace::Use, "dev-libs/bar", ["ssl"])
}

/// Run a command line; returns what the output directives printed
fn run(root: &Path, line: &str) -> Result<String, ConfigError> {
    let args: Vec<String> = line.split_whitespace().map(String::from).collect();
    let mut cache = FlagCache::new(metadata());
    let mut files = PackageFiles::new(root, &["amd64"]);
    let mut out = Vec::new();

    for set in parse_actions(&args, &mut cache, &Verbatim)? {
        set.apply(&mut files, &mut out)?;
    }
    files.write()?;
    Ok(String::from_utf8(out).unwrap())
}

fn read(root: &Path, name: &str) -> String {
    fs::read_to_string(root.join(name)).unwrap()
}

mod enable_disable {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_new_entry() {
        let dir = TempDir::new().unwrap();
        run(dir.path(), "dev-libs/foo +ssl -doc").unwrap();
        assert_eq!(read(dir.path(), "package.use"), "dev-libs/foo ssl -doc\n");
    }

    #[test]
    fn test_flags_are_coalesced() {
        let dir = TempDir::new().unwrap();
        run(dir.path(), "dev-libs/foo +use::b +use::a").unwrap();
        assert_eq!(read(dir.path(), "package.use"), "dev-libs/foo a b\n");
    }

    #[test]
    fn test_existing_flag_is_rewritten_in_place() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("package.use"),
            "# header\n\ndev-libs/foo -ssl doc # keep\ndev-libs/bar ssl\n",
        )
        .unwrap();

        run(dir.path(), "dev-libs/foo +ssl").unwrap();
        assert_eq!(
            read(dir.path(), "package.use"),
            "# header\n\ndev-libs/foo ssl doc # keep\ndev-libs/bar ssl\n"
        );
    }

    #[test]
    fn test_later_entry_in_same_file_is_changed() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("package.use"),
            "dev-libs/foo ssl doc\n# later\ndev-libs/foo -ssl\n",
        )
        .unwrap();

        run(dir.path(), "dev-libs/foo +ssl +use::static").unwrap();
        assert_eq!(
            read(dir.path(), "package.use"),
            "dev-libs/foo ssl doc\n# later\ndev-libs/foo ssl static\n"
        );
    }

    #[test]
    fn test_most_effective_entry_is_changed() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("package.use")).unwrap();
        fs::write(dir.path().join("package.use/00-base"), "dev-libs/foo ssl\n").unwrap();
        fs::write(dir.path().join("package.use/10-local"), "dev-libs/foo ssl\n").unwrap();

        run(dir.path(), "dev-libs/foo -ssl +doc").unwrap();
        assert_eq!(read(dir.path(), "package.use/00-base"), "dev-libs/foo ssl\n");
        assert_eq!(
            read(dir.path(), "package.use/10-local"),
            "dev-libs/foo -ssl doc\n"
        );
    }

    #[test]
    fn test_several_packages() {
        let dir = TempDir::new().unwrap();
        run(dir.path(), "dev-libs/foo dev-libs/bar +ssl").unwrap();
        assert_eq!(
            read(dir.path(), "package.use"),
            "dev-libs/foo ssl\ndev-libs/bar ssl\n"
        );
    }

    #[test]
    fn test_keywords_and_licenses() {
        let dir = TempDir::new().unwrap();
        run(dir.path(), "dev-libs/foo +~amd64 +kw::~x86 +lic::MIT").unwrap();
        assert_eq!(
            read(dir.path(), "package.accept_keywords"),
            "dev-libs/foo ~amd64 ~x86\n"
        );
        assert_eq!(read(dir.path(), "package.license"), "dev-libs/foo MIT\n");
        assert!(!dir.path().join("package.keywords").exists());
    }

    #[test]
    fn test_default_keyword_is_written_bare() {
        let dir = TempDir::new().unwrap();
        run(dir.path(), "dev-libs/foo +~amd64").unwrap();
        assert_eq!(read(dir.path(), "package.accept_keywords"), "dev-libs/foo\n");
    }

    #[test]
    fn test_disabled_env_entries_are_dropped() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("package.env"), "dev-libs/foo debug.conf\n").unwrap();

        run(dir.path(), "dev-libs/foo +env::lto.conf -env::debug.conf").unwrap();
        assert_eq!(read(dir.path(), "package.env"), "dev-libs/foo lto.conf\n");

        run(dir.path(), "dev-libs/foo -env::lto.conf").unwrap();
        assert!(!dir.path().join("package.env").exists());
    }
}

mod reset {
    use super::*;
    use pretty_assertions::assert_eq;

    const CONTENT: &str = "# a\ndev-libs/foo x ssl\n# b\ndev-libs/bar ssl\ndev-libs/foo doc\n";

    #[test]
    fn test_reset_named_flag() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("package.use"), CONTENT).unwrap();

        run(dir.path(), "dev-libs/foo %ssl").unwrap();
        assert_eq!(
            read(dir.path(), "package.use"),
            "# a\ndev-libs/foo x\n# b\ndev-libs/bar ssl\ndev-libs/foo doc\n"
        );
    }

    #[test]
    fn test_reset_removes_emptied_entries() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("package.use"), CONTENT).unwrap();

        run(dir.path(), "dev-libs/foo %doc").unwrap();
        assert_eq!(
            read(dir.path(), "package.use"),
            "# a\ndev-libs/foo x ssl\n# b\ndev-libs/bar ssl\n"
        );
    }

    #[test]
    fn test_reset_whole_package() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("package.use"), CONTENT).unwrap();

        run(dir.path(), "dev-libs/foo %").unwrap();
        assert_eq!(
            read(dir.path(), "package.use"),
            "# a\n# b\ndev-libs/bar ssl\n"
        );
        assert_eq!(read(dir.path(), "package.use~"), CONTENT);
    }

    #[test]
    fn test_reset_whole_package_in_domain() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("package.use"), CONTENT).unwrap();
        fs::write(
            dir.path().join("package.accept_keywords"),
            "dev-libs/foo ~x86\n",
        )
        .unwrap();

        run(dir.path(), "dev-libs/foo %kw::").unwrap();
        assert_eq!(read(dir.path(), "package.use"), CONTENT);
        assert!(!dir.path().join("package.accept_keywords").exists());
    }
}

mod output {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_print_all_flags() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("package.use")).unwrap();
        fs::write(dir.path().join("package.use/a"), "dev-libs/foo ssl x\n").unwrap();
        fs::write(dir.path().join("package.use/b"), "dev-libs/foo -ssl\n").unwrap();

        let out = run(dir.path(), "dev-libs/foo ?").unwrap();
        assert_eq!(out, "dev-libs/foo -ssl x\n");
    }

    #[test]
    fn test_later_entry_in_same_file_wins() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("package.use"),
            "dev-libs/foo ssl\ndev-libs/foo -ssl doc\n",
        )
        .unwrap();

        assert_eq!(run(dir.path(), "dev-libs/foo ?ssl").unwrap(), "dev-libs/foo -ssl\n");
        assert_eq!(run(dir.path(), "dev-libs/foo ?").unwrap(), "dev-libs/foo doc -ssl\n");
    }

    #[test]
    fn test_print_named_flags() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("package.use"), "dev-libs/foo -ssl\n").unwrap();

        let out = run(dir.path(), "dev-libs/foo ?ssl ?doc").unwrap();
        assert_eq!(out, "dev-libs/foo ?doc -ssl\n");
    }

    #[test]
    fn test_output_runs_after_changes() {
        let dir = TempDir::new().unwrap();
        let out = run(dir.path(), "dev-libs/foo ?ssl +ssl").unwrap();
        assert_eq!(out, "dev-libs/foo ssl\n");
    }

    #[test]
    fn test_output_does_not_write() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("package.use"), "dev-libs/foo ssl\n").unwrap();

        run(dir.path(), "dev-libs/foo ? dev-libs/bar ?").unwrap();
        assert!(!dir.path().join("package.use~").exists());
    }
}

mod errors {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_ambiguous_flag_changes_nothing() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("package.use"), "dev-libs/foo doc\n").unwrap();

        let err = run(dir.path(), "dev-libs/foo +doc +x").unwrap_err();
        assert_matches!(
            err,
            ConfigError::AtArgument { index: 2, ref token, ref source }
                if token == "+x" && matches!(**source, ConfigError::AmbiguousArgument { .. })
        );
        assert_eq!(read(dir.path(), "package.use"), "dev-libs/foo doc\n");
    }

    #[test]
    fn test_missing_argument() {
        let dir = TempDir::new().unwrap();
        let err = run(dir.path(), "dev-libs/foo -").unwrap_err();
        assert_eq!(
            err.to_string(),
            "At argv[1]='-': - action requires an argument!"
        );
    }

    #[test]
    fn test_global_actions_are_rejected() {
        let dir = TempDir::new().unwrap();
        let err = run(dir.path(), "+ssl").unwrap_err();
        assert_matches!(err, ConfigError::UnsupportedGlobalAction);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_unknown_domain() {
        let dir = TempDir::new().unwrap();
        let err = run(dir.path(), "dev-libs/foo +mask::x").unwrap_err();
        assert_matches!(err, ConfigError::UnknownNamespace(ns) if ns == "mask");
    }
}
