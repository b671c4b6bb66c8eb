//! Integration tests for the json-structure CLI.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("json-structure"))
}

fn write_temp_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

const PERSON_SCHEMA: &str = r#"{
    "$schema": "https://json-structure.org/meta/core/v0/#",
    "$id": "https://example.com/person.json",
    "name": "Person",
    "type": "object",
    "properties": {
        "firstName": { "type": "string" },
        "lastName": { "type": "string" }
    },
    "required": ["firstName", "lastName"]
}"#;

mod schema_command {
    use super::*;

    #[test]
    fn valid_schema() {
        let dir = TempDir::new().unwrap();
        let schema = write_temp_file(&dir, "schema.json", PERSON_SCHEMA);

        cmd()
            .args(["schema", schema.to_str().unwrap()])
            .assert()
            .success()
            .stdout(predicate::str::contains("Valid"));
    }

    #[test]
    fn diagnostics_exit_code_1() {
        let dir = TempDir::new().unwrap();
        let schema = write_temp_file(
            &dir,
            "schema.json",
            r#"{
                "$schema": "https://json-structure.org/meta/core/v0/#",
                "$id": "https://example.com/schema.json",
                "name": "Broken",
                "type": "object",
                "properties": { "a": { "type": "string" } },
                "required": ["a", "b"]
            }"#,
        );

        cmd()
            .args(["schema", schema.to_str().unwrap()])
            .assert()
            .code(1)
            .stderr(predicate::str::contains("UnknownRequiredProperty"));
    }

    #[test]
    fn warnings_still_valid() {
        let dir = TempDir::new().unwrap();
        let schema = write_temp_file(&dir, "schema.json", r#"{"name": "Label", "type": "string"}"#);

        cmd()
            .args(["schema", schema.to_str().unwrap()])
            .assert()
            .success()
            .stdout(predicate::str::contains("warning"))
            .stdout(predicate::str::contains("Valid (with warnings)"));
    }

    #[test]
    fn malformed_json_exit_code_2() {
        let dir = TempDir::new().unwrap();
        let schema = write_temp_file(&dir, "bad.json", "{ not valid json");

        cmd()
            .args(["schema", schema.to_str().unwrap()])
            .assert()
            .code(2);
    }

    #[test]
    fn unresolved_ref_exit_code_2() {
        let dir = TempDir::new().unwrap();
        let schema = write_temp_file(
            &dir,
            "schema.json",
            r##"{
                "$schema": "https://json-structure.org/meta/core/v0/#",
                "$id": "https://example.com/schema.json",
                "name": "Order",
                "type": "object",
                "properties": { "item": { "$ref": "#/definitions/Missing" } }
            }"##,
        );

        cmd()
            .args(["schema", schema.to_str().unwrap()])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("#/definitions/Missing"));
    }

    #[test]
    fn file_not_found_exit_code_3() {
        cmd()
            .args(["schema", "/nonexistent/schema.json"])
            .assert()
            .code(3);
    }

    #[test]
    fn json_output_valid() {
        let dir = TempDir::new().unwrap();
        let schema = write_temp_file(&dir, "schema.json", PERSON_SCHEMA);

        cmd()
            .args(["schema", schema.to_str().unwrap(), "--json"])
            .assert()
            .success()
            .stdout(predicate::str::contains(r#""valid":true"#));
    }

    #[test]
    fn json_output_fatal_error() {
        let dir = TempDir::new().unwrap();
        let schema = write_temp_file(&dir, "bad.json", "{ not valid json");

        cmd()
            .args(["schema", schema.to_str().unwrap(), "--json"])
            .assert()
            .code(2)
            .stdout(predicate::str::contains(r#""valid":false"#))
            .stdout(predicate::str::contains(r#""error":"#));
    }

    #[test]
    fn gated_keyword_needs_uses_flag() {
        let dir = TempDir::new().unwrap();
        let schema = write_temp_file(
            &dir,
            "schema.json",
            r#"{
                "$schema": "https://json-structure.org/meta/core/v0/#",
                "$id": "https://example.com/schema.json",
                "name": "Port",
                "type": "int32",
                "minimum": 0
            }"#,
        );

        cmd()
            .args(["schema", schema.to_str().unwrap()])
            .assert()
            .code(1)
            .stderr(predicate::str::contains("FeatureNotActivated"));

        cmd()
            .args([
                "schema",
                schema.to_str().unwrap(),
                "--uses",
                "JSONStructureValidation",
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains("Valid"));
    }

    #[test]
    fn importmap_redirects_import() {
        let dir = TempDir::new().unwrap();
        let common = write_temp_file(
            &dir,
            "common.json",
            r#"{
                "$schema": "https://json-structure.org/meta/core/v0/#",
                "$id": "https://example.com/common.json",
                "definitions": {
                    "Label": { "name": "Label", "type": "string" }
                }
            }"#,
        );
        let schema = write_temp_file(
            &dir,
            "schema.json",
            r##"{
                "$schema": "https://json-structure.org/meta/core/v0/#",
                "$id": "https://example.com/schema.json",
                "$importdefs": "https://example.com/common.json",
                "name": "Tag",
                "type": "object",
                "properties": { "label": { "$ref": "#/definitions/Label" } }
            }"##,
        );

        cmd()
            .args([
                "schema",
                schema.to_str().unwrap(),
                "--allow-import",
                "--importmap",
                &format!("https://example.com/common.json={}", common.display()),
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains("Valid"));
    }

    #[test]
    fn importmap_bad_format() {
        let dir = TempDir::new().unwrap();
        let schema = write_temp_file(&dir, "schema.json", PERSON_SCHEMA);

        cmd()
            .args([
                "schema",
                schema.to_str().unwrap(),
                "--allow-import",
                "--importmap",
                "no-equals-sign",
            ])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("URI=FILE"));
    }
}

mod instance_command {
    use super::*;

    #[test]
    fn valid_instance() {
        let dir = TempDir::new().unwrap();
        let schema = write_temp_file(&dir, "schema.json", PERSON_SCHEMA);
        let instance = write_temp_file(
            &dir,
            "instance.json",
            r#"{"firstName": "Ada", "lastName": "Lovelace"}"#,
        );

        cmd()
            .args([
                "instance",
                instance.to_str().unwrap(),
                "--schema",
                schema.to_str().unwrap(),
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains("Valid"));
    }

    #[test]
    fn missing_required_property() {
        let dir = TempDir::new().unwrap();
        let schema = write_temp_file(&dir, "schema.json", PERSON_SCHEMA);
        let instance = write_temp_file(&dir, "instance.json", r#"{"firstName": "Ada"}"#);

        cmd()
            .args([
                "instance",
                instance.to_str().unwrap(),
                "--schema",
                schema.to_str().unwrap(),
            ])
            .assert()
            .code(1)
            .stderr(predicate::str::contains("MissingRequiredProperty"))
            .stderr(predicate::str::contains("/lastName"));
    }

    #[test]
    fn invalid_schema_aborts_with_exit_code_2() {
        let dir = TempDir::new().unwrap();
        let schema = write_temp_file(
            &dir,
            "schema.json",
            r#"{
                "$schema": "https://json-structure.org/meta/core/v0/#",
                "$id": "https://example.com/schema.json",
                "name": "Broken",
                "type": "object",
                "properties": {},
                "required": ["ghost"]
            }"#,
        );
        let instance = write_temp_file(&dir, "instance.json", "{}");

        cmd()
            .args([
                "instance",
                instance.to_str().unwrap(),
                "--schema",
                schema.to_str().unwrap(),
            ])
            .assert()
            .code(2);
    }

    #[test]
    fn json_output_reports_diagnostics() {
        let dir = TempDir::new().unwrap();
        let schema = write_temp_file(&dir, "schema.json", PERSON_SCHEMA);
        let instance = write_temp_file(&dir, "instance.json", "{}");

        cmd()
            .args([
                "instance",
                instance.to_str().unwrap(),
                "--schema",
                schema.to_str().unwrap(),
                "--json",
            ])
            .assert()
            .code(1)
            .stdout(predicate::str::contains(r#""valid":false"#))
            .stdout(predicate::str::contains(r#""diagnostics":"#));
    }

    #[test]
    fn fixture_roundtrip() {
        cmd()
            .args([
                "instance",
                "tests/fixtures/flying_car.json",
                "--schema",
                "tests/fixtures/vehicles.json",
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains("Valid"));
    }

    #[test]
    fn missing_instance_file_exit_code_3() {
        let dir = TempDir::new().unwrap();
        let schema = write_temp_file(&dir, "schema.json", PERSON_SCHEMA);

        cmd()
            .args([
                "instance",
                "/nonexistent/instance.json",
                "--schema",
                schema.to_str().unwrap(),
            ])
            .assert()
            .code(3);
    }
}

mod lint_command {
    use super::*;

    #[test]
    fn lint_clean_directory() {
        let dir = TempDir::new().unwrap();
        write_temp_file(&dir, "person.json", PERSON_SCHEMA);

        cmd()
            .args(["lint", dir.path().to_str().unwrap()])
            .assert()
            .success()
            .stdout(predicate::str::contains("all passed"));
    }

    #[test]
    fn lint_mixed_directory() {
        let dir = TempDir::new().unwrap();
        write_temp_file(&dir, "good.json", PERSON_SCHEMA);
        write_temp_file(&dir, "bad.json", "{ not json");

        cmd()
            .args(["lint", dir.path().to_str().unwrap()])
            .assert()
            .code(1)
            .stdout(predicate::str::contains("1 passed"))
            .stdout(predicate::str::contains("1 failed"));
    }

    #[test]
    fn lint_strict_fails_on_warnings() {
        let dir = TempDir::new().unwrap();
        write_temp_file(&dir, "label.json", r#"{"name": "Label", "type": "string"}"#);

        cmd()
            .args(["lint", dir.path().to_str().unwrap()])
            .assert()
            .success();

        cmd()
            .args(["lint", dir.path().to_str().unwrap(), "--strict"])
            .assert()
            .code(1);
    }

    #[test]
    fn lint_json_format() {
        let dir = TempDir::new().unwrap();
        write_temp_file(&dir, "person.json", PERSON_SCHEMA);

        cmd()
            .args(["lint", dir.path().to_str().unwrap(), "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains(r#""files_checked": 1"#))
            .stdout(predicate::str::contains(r#""status": "ok""#));
    }

    #[test]
    fn lint_path_not_found() {
        cmd()
            .args(["lint", "/nonexistent/schemas"])
            .assert()
            .code(3)
            .stderr(predicate::str::contains("not found"));
    }
}

mod help_and_version {
    use super::*;

    #[test]
    fn help_flag() {
        cmd()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("schema"))
            .stdout(predicate::str::contains("instance"))
            .stdout(predicate::str::contains("lint"));
    }

    #[test]
    fn version_flag() {
        cmd()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("json-structure"));
    }

    #[test]
    fn instance_requires_schema_flag() {
        let dir = TempDir::new().unwrap();
        let instance = write_temp_file(&dir, "instance.json", "{}");

        cmd()
            .args(["instance", instance.to_str().unwrap()])
            .assert()
            .failure()
            .stderr(predicate::str::contains("--schema"));
    }
}
