use crate::models::Account;
use anyhow::{bail, Context, Result};
use std::collections::BTreeMap;
use std::path::Path;

const PROFILE_BASE: &str = "https://es.wallapop.com/user";

/// Every MOTICK seller profile, in scrape order
const ALL_ACCOUNTS: &[(&str, &str)] = &[
    ("MOTICK.MA M.", "motick-432763398"),
    ("MOTICK-MA M.", "motickm-459455125"),
    ("MOTICK.SE S.", "jaimed-432757399"),
    ("MOTICK-SE S.", "sevillam-459507970"),
    ("MOTICK.VA V.", "carlosm-432759147"),
    ("MOTICK-VA V.", "vlc2motickwallapop-459335984"),
    ("MOTICK.NO N.", "motickn-433191765"),
    ("MOTICK-BI B.", "alicante2-459337788"),
    ("MOTICK.MU M.", "jaimev-453393496"),
    ("MOTICK.MAL M.", "motickm-434475757"),
    ("MOTICK-MAL M.", "motickm-459451156"),
    ("MOTICK.BA B.", "motick-432499045"),
    ("MOTICK-BA B.", "ysuwr-459336516"),
];

/// Accounts used when test mode is on
const TEST_ACCOUNTS: &[&str] = &["MOTICK.MA M.", "MOTICK.BA B."];

pub fn all_accounts() -> Vec<Account> {
    ALL_ACCOUNTS
        .iter()
        .map(|(name, slug)| Account::new(*name, format!("{}/{}", PROFILE_BASE, slug)))
        .collect()
}

pub fn test_accounts() -> Vec<Account> {
    all_accounts()
        .into_iter()
        .filter(|account| TEST_ACCOUNTS.contains(&account.name.as_str()))
        .collect()
}

pub fn accounts_for_mode(test_mode: bool) -> Vec<Account> {
    if test_mode {
        test_accounts()
    } else {
        all_accounts()
    }
}

/// Parse a JSON object mapping account name to profile URL
pub fn parse_accounts(json: &str) -> Result<Vec<Account>> {
    let map: BTreeMap<String, String> =
        serde_json::from_str(json).context("Accounts file must be a JSON object of name → URL")?;

    if map.is_empty() {
        bail!("Accounts file lists no accounts");
    }

    map.into_iter()
        .map(|(name, url)| {
            let parsed = url::Url::parse(&url)
                .with_context(|| format!("Invalid profile URL for {}: {}", name, url))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                bail!("Profile URL for {} is not http(s): {}", name, url);
            }
            Ok(Account::new(name, url))
        })
        .collect()
}

pub fn load_accounts(path: &Path) -> Result<Vec<Account>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read accounts file {}", path.display()))?;
    parse_accounts(&json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_account_sets() {
        let all = all_accounts();
        assert_eq!(all.len(), 13);
        assert_eq!(all[0].profile_url, "https://es.wallapop.com/user/motick-432763398");

        let test = accounts_for_mode(true);
        let names: Vec<_> = test.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["MOTICK.MA M.", "MOTICK.BA B."]);
    }

    #[test]
    fn test_account_names_are_unique() {
        let all = all_accounts();
        let mut names: Vec<_> = all.iter().map(|a| &a.name).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), all.len());
    }

    #[test]
    fn test_parse_accounts_json() {
        let accounts = parse_accounts(
            r#"{"Taller Norte": "https://es.wallapop.com/user/norte-1", "Taller Sur": "https://es.wallapop.com/user/sur-2"}"#,
        )
        .unwrap();
        assert_eq!(accounts.len(), 2);
        assert_eq!(accounts[0].name, "Taller Norte");

        assert!(parse_accounts("{}").is_err());
        assert!(parse_accounts(r#"["a"]"#).is_err());
        assert!(parse_accounts(r#"{"x": "not a url"}"#).is_err());
    }

    #[test]
    fn test_load_accounts_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"Solo": "https://es.wallapop.com/user/solo-3"}}"#).unwrap();
        let accounts = load_accounts(file.path()).unwrap();
        assert_eq!(accounts, vec![Account::new("Solo", "https://es.wallapop.com/user/solo-3")]);

        assert!(load_accounts(Path::new("/nonexistent/accounts.json")).is_err());
    }
}
