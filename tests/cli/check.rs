use anyhow::Result;

use crate::{CliTest, streams};

const CATALOG_EN: &str = "page:\n  title: Title\n  intro: Welcome\n";

#[test]
fn test_clean_project() -> Result<()> {
    let test = CliTest::with_file(
        "templates/page.html.twig",
        "<h1>{{ 'page.title'|trans }}</h1>\n<p>{{ 'page.intro'|trans }}</p>\n",
    )?;
    test.write_file("translations/messages.en.yaml", CATALOG_EN)?;

    let output = test.check_command().output()?;
    let (stdout, _) = streams(&output);

    assert_eq!(output.status.code(), Some(0));
    assert_eq!(
        stdout,
        "✓ Checked 1 template, 1 catalog file - no issues found\n"
    );

    Ok(())
}

#[test]
fn test_missing_key() -> Result<()> {
    let test = CliTest::with_file(
        "templates/page.html.twig",
        "<h1>{{ 'page.title'|trans }}</h1>\n<p>{{ 'page.missing'|trans }}</p>\n",
    )?;
    test.write_file("translations/messages.en.yaml", CATALOG_EN)?;

    let output = test.check_command().output()?;
    let (stdout, _) = streams(&output);

    assert_eq!(output.status.code(), Some(1));
    assert_eq!(
        stdout,
        "error: \"page.missing\"  missing-key\n  \
         --> templates/page.html.twig:2:7\n  \
         |\n\
         2 | <p>{{ 'page.missing'|trans }}</p>\n  \
         |       ^\n\
         \n\
         ✘ 1 problems (1 error, 0 warnings)\n"
    );

    Ok(())
}

#[test]
fn test_default_domain_scopes_lookup() -> Result<()> {
    let test = CliTest::with_file(
        "templates/admin.html.twig",
        "{% trans_default_domain 'admin' %}\n{{ 'page.title'|trans }}\n",
    )?;
    test.write_file("translations/messages.en.yaml", CATALOG_EN)?;

    let output = test.check_command().output()?;
    let (stdout, _) = streams(&output);

    assert_eq!(output.status.code(), Some(1));
    assert!(stdout.contains("= note: not found in domain 'admin'"));
    assert!(stdout.contains("= hint: defined in: messages"));

    Ok(())
}

#[test]
fn test_missing_required_locale_is_a_warning() -> Result<()> {
    let test = CliTest::with_file(
        "templates/page.html.twig",
        "{{ 'page.title'|trans }}\n",
    )?;
    test.write_file("translations/messages.en.yaml", CATALOG_EN)?;
    test.write_file("translations/messages.fr.json", r#"{"page": {"intro": "Bienvenue"}}"#)?;
    test.write_file(".translensrc.json", r#"{"requiredLocales": ["en", "FR"]}"#)?;

    let output = test.check_command().output()?;
    let (stdout, _) = streams(&output);

    assert_eq!(output.status.code(), Some(0));
    assert!(stdout.starts_with("warning: \"page.title\"  missing-locale\n"));
    assert!(stdout.contains("= note: missing in: fr"));
    assert!(stdout.contains("(0 errors, 1 warning)"));

    Ok(())
}

#[test]
fn test_broken_catalog_is_reported() -> Result<()> {
    let test = CliTest::with_file("templates/page.html.twig", "{{ 'page.title'|trans }}\n")?;
    test.write_file("translations/messages.en.yaml", CATALOG_EN)?;
    test.write_file("translations/messages.de.yaml", "page: [unclosed\n")?;

    let output = test.check_command().output()?;
    let (stdout, stderr) = streams(&output);

    assert_eq!(output.status.code(), Some(0));
    assert!(stdout.contains("parse-error"));
    assert!(stdout.contains("--> translations/messages.de.yaml\n"));
    assert!(stderr.contains("warning: 1 file(s) could not be parsed (use -v for details)"));

    Ok(())
}

#[test]
fn test_broken_template_falls_back_to_catalog_keys() -> Result<()> {
    let test = CliTest::with_file(
        "templates/broken.html.twig",
        "{% if user %}\n{{ 'page.title'|trans }}\n{{ 'not.in.catalog'|trans }}\n",
    )?;
    test.write_file("translations/messages.en.yaml", CATALOG_EN)?;

    let output = test.check_command().output()?;
    let (stdout, _) = streams(&output);

    // Candidates unknown to the catalog are dropped, so only the parse error remains
    assert_eq!(output.status.code(), Some(0));
    assert!(stdout.contains("--> templates/broken.html.twig\n"));
    assert!(stdout.contains("= hint: keys were collected with the generic scan"));
    assert!(!stdout.contains("missing-key"));

    Ok(())
}

#[test]
fn test_config_ignores() -> Result<()> {
    let test = CliTest::with_file(
        "templates/generated/page.html.twig",
        "{{ 'unknown'|trans }}\n",
    )?;
    test.write_file("translations/messages.en.yaml", CATALOG_EN)?;
    test.write_file(".translensrc.json", r#"{"ignores": ["**/generated/**"]}"#)?;

    let output = test.check_command().output()?;
    let (stdout, _) = streams(&output);

    assert_eq!(output.status.code(), Some(0));
    assert!(stdout.contains("Checked 0 templates"));

    Ok(())
}

#[test]
fn test_root_argument() -> Result<()> {
    let test = CliTest::with_file("app/templates/page.twig", "{{ 'page.title'|trans }}\n")?;
    test.write_file("app/translations/messages.en.yaml", CATALOG_EN)?;

    let output = test.check_command().args(["--root", "app"]).output()?;
    let (stdout, _) = streams(&output);

    assert_eq!(output.status.code(), Some(0));
    assert!(stdout.contains("Checked 1 template, 1 catalog file"));

    Ok(())
}

#[test]
fn test_invalid_config_is_an_error() -> Result<()> {
    let test = CliTest::new()?;
    test.write_file(".translensrc.json", r#"{"keyPattern": "("}"#)?;

    let output = test.check_command().output()?;
    let (_, stderr) = streams(&output);

    assert_eq!(output.status.code(), Some(2));
    assert!(stderr.starts_with("Error:"));

    Ok(())
}

#[test]
fn test_help() -> Result<()> {
    let test = CliTest::new()?;

    let output = test.command().arg("--help").output()?;
    let (stdout, _) = streams(&output);

    assert!(output.status.success());
    for command in ["check", "keys", "init"] {
        assert!(stdout.contains(command), "help should list '{}'", command);
    }

    Ok(())
}
