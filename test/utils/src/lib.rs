/// A chat record as written by an older client: string, numeric and wrapped
/// timestamps mixed together, plus one that can't be parsed at all.
pub fn legacy_chat_fixture() -> &'static str {
    return r#"
{
  "id": "5f0c2a4e-91b7",
  "title": "Quarterly numbers",
  "createdAt": "2024-03-01T09:30:00.000Z",
  "messages": [
    {
      "id": "m1",
      "content": "Can you summarize the quarterly numbers?",
      "role": "user",
      "timestamp": "2024-03-01T09:30:05.000Z",
      "files": [
        { "name": "q1.csv", "size": 2048, "type": "text/csv" }
      ]
    },
    {
      "id": "m2",
      "content": "Revenue grew 12% quarter over quarter.",
      "role": "assistant",
      "timestamp": 1709285410000
    },
    {
      "id": "m3",
      "content": "And expenses?",
      "role": "user",
      "timestamp": { "$date": "2024-03-01T09:31:00Z" },
      "isEdited": true
    },
    {
      "id": "m4",
      "content": "Expenses were flat.",
      "role": "assistant",
      "timestamp": "not a date"
    }
  ]
}
"#
    .trim();
}
