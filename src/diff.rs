#[cfg(feature = "color")]
use colored::Colorize;
use similar::{ChangeTag, TextDiff};

pub fn compare(expected: &str, actual: &str) -> String {
    let mut result = String::new();

    let clean_expected = expected.replace("\r\n", "\n");
    let clean_actual = actual.replace("\r\n", "\n");

    let diff = TextDiff::from_lines(&clean_expected, &clean_actual);
    let mut last_removed: Option<&str> = None;

    for change in diff.iter_all_changes() {
        let line = change.value().trim_end_matches('\n');

        match change.tag() {
            ChangeTag::Equal => {
                result.push_str(line);
                result.push('\n');
                last_removed = None;
            }
            ChangeTag::Insert => {
                if let Some(removed) = last_removed.take() {
                    let words = TextDiff::from_words(removed, line);
                    for word in words.iter_all_changes() {
                        match word.tag() {
                            ChangeTag::Equal => {
                                #[cfg(feature = "color")]
                                result.push_str(&word.value().green().to_string());
                                #[cfg(not(feature = "color"))]
                                result.push_str(word.value());
                            }
                            ChangeTag::Insert => {
                                #[cfg(feature = "color")]
                                result.push_str(&word.value().white().on_green().to_string());
                                #[cfg(not(feature = "color"))]
                                result.push_str(word.value());
                            }
                            ChangeTag::Delete => (),
                        }
                    }
                } else {
                    #[cfg(feature = "color")]
                    result.push_str(&line.bright_green().to_string());
                    #[cfg(not(feature = "color"))]
                    result.push_str(line);
                }

                result.push('\n');
            }
            ChangeTag::Delete => {
                #[cfg(feature = "color")]
                result.push_str(&line.red().to_string());
                #[cfg(not(feature = "color"))]
                result.push_str(line);

                result.push('\n');
                last_removed = Some(line);
            }
        }
    }

    result
}
