use anyhow::Result;
use serde_json::Value;

use crate::{CliTest, streams};

fn project() -> Result<CliTest> {
    let test = CliTest::with_file(
        "templates/page.html.twig",
        "{% trans_default_domain 'admin' %}\n{{ 'nav.home'|trans }}\n{{ 'nav.away'|trans({}, null, 'de') }}\n",
    )?;
    test.write_file("templates/other.html.twig", "{{ 'other'|trans }}\n")?;
    test.write_file("translations/admin.en.yaml", "nav:\n  home: Home\n")?;
    test.write_file("translations/admin+intl-icu.fr.json", r#"{"nav": {"home": "Accueil"}}"#)?;
    Ok(test)
}

#[test]
fn test_keys_text() -> Result<()> {
    let test = project()?;

    let output = test
        .keys_command()
        .arg("templates/page.html.twig")
        .output()?;
    let (stdout, _) = streams(&output);

    assert_eq!(output.status.code(), Some(0));
    assert!(stdout.contains("templates/page.html.twig:2:4 nav.home  (domain: admin)\n"));
    assert!(stdout.contains("  = admin/en: Home  --> translations/admin.en.yaml:2:9\n"));
    assert!(stdout.contains("  = admin/fr: Accueil  --> translations/admin+intl-icu.fr.json:1:18\n"));
    assert!(stdout.contains("nav.away  (domain: admin, locale: de)\n  = not translated\n"));
    assert!(stdout.ends_with("✓ 2 usages in 1 template\n"));
    assert!(!stdout.contains("other"));

    Ok(())
}

#[test]
fn test_keys_json() -> Result<()> {
    let test = project()?;

    let output = test.keys_command().arg("--json").output()?;
    let (stdout, _) = streams(&output);
    assert_eq!(output.status.code(), Some(0));

    let templates: Value = serde_json::from_str(&stdout)?;
    let templates = templates.as_array().expect("an array of templates");
    assert_eq!(templates.len(), 2);

    let page = templates
        .iter()
        .find(|t| t["fileName"] == "templates/page.html.twig")
        .expect("page template");
    let home = &page["usages"][0];
    assert_eq!(home["occurrence"]["value"], "nav.home");
    assert_eq!(home["occurrence"]["domain"], "admin");
    assert_eq!(home["occurrence"]["range"]["start"]["line"], 1);

    let locales: Vec<&str> = home["translations"]
        .as_array()
        .expect("translations")
        .iter()
        .filter_map(|t| t["locale"].as_str())
        .collect();
    assert_eq!(locales, vec!["en", "fr"]);

    Ok(())
}

#[test]
fn test_keys_never_fails_on_unknown_keys() -> Result<()> {
    let test = CliTest::with_file("templates/page.twig", "{{ 'unknown'|trans }}\n")?;

    let output = test.keys_command().output()?;
    let (stdout, _) = streams(&output);

    assert_eq!(output.status.code(), Some(0));
    assert!(stdout.contains("templates/page.twig:1:4 unknown\n  = not translated\n"));

    Ok(())
}
