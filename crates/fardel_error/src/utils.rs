pub fn format_quoted_strings(list: &[String]) -> String {
  let mut quoted = list
    .iter()
    .map(|s| format!("\"{s}\""))
    .collect::<Vec<_>>();
  match quoted.len() {
    0 => String::new(),
    1 => quoted.remove(0),
    2 => format!("{} and {}", quoted[0], quoted[1]),
    _ => {
      let last = quoted.pop().unwrap();
      format!("{} and {last}", quoted.join(", "))
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn joins_with_and() {
    let list = vec!["a".to_string(), "b".to_string(), "c".to_string()];
    assert_eq!(format_quoted_strings(&list), "\"a\", \"b\" and \"c\"");
    assert_eq!(format_quoted_strings(&list[..2]), "\"a\" and \"b\"");
    assert_eq!(format_quoted_strings(&list[..1]), "\"a\"");
  }
}
