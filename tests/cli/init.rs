use anyhow::{Context, Result};
use serde_json::Value;

use crate::{CliTest, streams};

/// Validates config file structure and default values.
fn assert_config_content(content: &str) -> Result<()> {
    let parsed: Value = serde_json::from_str(content).context("Config should be valid JSON")?;

    for field in [
        "templateRoots",
        "translationFolders",
        "translationFilePatterns",
        "parsingMode",
        "keyPattern",
    ] {
        assert!(
            parsed.get(field).is_some(),
            "Config should have '{}' field",
            field
        );
    }

    assert!(
        content.contains("  "),
        "Config should use 2-space indentation"
    );

    Ok(())
}

#[test]
fn test_init_creates_config() -> Result<()> {
    let test = CliTest::new()?;

    let output = test.init_command().output()?;
    let (stdout, _) = streams(&output);

    assert_eq!(output.status.code(), Some(0));
    assert_eq!(stdout, "✓ Created .translensrc.json\n");
    assert!(test.root().join(".translensrc.json").exists());

    let content = test.read_file(".translensrc.json")?;
    assert_config_content(&content)?;

    Ok(())
}

#[test]
fn test_init_fails_if_exists() -> Result<()> {
    let test = CliTest::new()?;
    test.write_file(".translensrc.json", "{}")?;

    let output = test.init_command().output()?;
    let (_, stderr) = streams(&output);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr.contains(".translensrc.json already exists"));
    assert_eq!(test.read_file(".translensrc.json")?, "{}");

    Ok(())
}

#[test]
fn test_init_config_is_immediately_usable() -> Result<()> {
    let test = CliTest::new()?;

    test.init_command().output()?;
    test.write_file("templates/base.html.twig", "{{ 'title'|trans }}\n")?;
    test.write_file("translations/messages.en.yaml", "title: Title\n")?;

    let output = test.check_command().output()?;
    assert!(
        output.status.success(),
        "Check command should work with initialized config. stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    Ok(())
}
