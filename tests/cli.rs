use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;

const JOURNAL: &str = "\
2021/01/01 Salary
    Assets:Bank       2.500,00 EUR
    Income:Salary

2021/01/02 Groceries  ; shop:corner,
    Expenses:Food       42,10 EUR
    Assets:Bank
";

#[test]
fn accounts_lists_top_level_categories() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("main.journal");
    fs::write(&path, JOURNAL)?;

    Command::cargo_bin("percolate")?
        .arg("-f")
        .arg(&path)
        .arg("accounts")
        .assert()
        .success()
        .stdout("Assets\nIncome\nExpenses\n");
    Ok(())
}

#[test]
fn print_renders_the_journal() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("main.journal");
    fs::write(&path, JOURNAL)?;

    Command::cargo_bin("percolate")?
        .env("LEDGER_FILE", &path)
        .arg("print")
        .assert()
        .success()
        .stdout(predicate::str::contains("2021/01/02 Groceries ; shop:corner,"))
        .stdout(predicate::str::contains("2500 EUR"));
    Ok(())
}

#[test]
fn missing_include_fails() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("main.journal");
    fs::write(&path, "include elsewhere.journal\n")?;

    Command::cargo_bin("percolate")?
        .arg("--file")
        .arg(&path)
        .arg("accounts")
        .assert()
        .failure()
        .stderr(predicate::str::contains("could not find include file `elsewhere.journal'"));
    Ok(())
}

#[test]
fn strict_mode_rejects_orphan_postings() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("main.journal");
    fs::write(&path, "  Assets:Cash  5 EUR\n")?;

    Command::cargo_bin("percolate")?
        .arg("-f")
        .arg(&path)
        .arg("-o")
        .arg("strict-postings=true")
        .arg("accounts")
        .assert()
        .failure()
        .stderr(predicate::str::contains("posting before any transaction header"));

    Command::cargo_bin("percolate")?
        .arg("-f")
        .arg(&path)
        .arg("accounts")
        .assert()
        .success()
        .stdout("");
    Ok(())
}
