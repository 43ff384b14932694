use serde_json::Value;

/// One display line for a scraped item: `"{timestamp}  ·  {text}"`.
pub fn item_line(item: &Value) -> String {
    let timestamp = first_str(item, &["createdAt", "date"]).unwrap_or("[no timestamp]");
    let text = first_str(item, &["text", "content"]).unwrap_or("[no text field]");
    format!("{timestamp}  ·  {text}")
}

/// An instruction followed by one line per item.
pub fn summary_prompt(instruction: &str, items: &[Value]) -> String {
    let mut prompt = String::from(instruction.trim_end());
    prompt.push_str("\n\n");
    for item in items {
        prompt.push_str(&item_line(item));
        prompt.push('\n');
    }
    prompt
}

fn first_str<'a>(item: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|k| item.get(*k).and_then(Value::as_str))
        .find(|s| !s.is_empty())
}
