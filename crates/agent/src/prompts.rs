//! Prompt assembly for the two LLM call sites.

use std::fmt::Write;

/// Schema summary handed to the model. Kept in lockstep with the
/// migrations in `tabula-db`.
pub const SCHEMA_SUMMARY: &str = "\
Tables:
  customers(id, name, email, phone, address, city, country, created_at)
  products(id, name, category, price, stock_quantity, created_at)
  orders(id, customer_id, order_date, status, total_amount)
  order_items(id, order_id, product_id, quantity, unit_price)
  reviews(id, product_id, customer_id, rating, body, created_at)
  inventory_log(id, product_id, quantity_change, reason, logged_at)";

pub const SQL_SYSTEM_PROMPT: &str = "\
You translate business questions into a single SQLite SELECT statement.
Rules:
- Output exactly one SELECT (or WITH ... SELECT) statement and nothing else.
- Never use INSERT, UPDATE, DELETE, DROP, ALTER, CREATE, or PRAGMA.
- Never use SQL comments.
- Only reference the tables listed in the schema.
- Prefer explicit column lists over SELECT *.";

pub fn sql_user_prompt(
    question: &str,
    allowed_tables: &[String],
    denial_feedback: Option<&str>,
) -> String {
    let mut prompt = String::new();
    let _ = writeln!(prompt, "Schema:\n{SCHEMA_SUMMARY}\n");
    let _ = writeln!(prompt, "Allowed tables: {}\n", allowed_tables.join(", "));
    if let Some(feedback) = denial_feedback {
        let _ = writeln!(
            prompt,
            "Your previous attempt was rejected: {feedback}\nProduce a corrected query.\n"
        );
    }
    let _ = write!(prompt, "Question: {question}");
    prompt
}

pub const GENERAL_SYSTEM_PROMPT: &str = "\
You are an assistant for a retail analytics service. Answer briefly and
helpfully. You can describe what kinds of questions the service can
answer about customers, products, orders, and reviews. Do not invent
data and do not produce SQL.";

/// Fallback when the model is unreachable for a general question.
pub const GENERAL_FALLBACK_RESPONSE: &str = "\
I can answer questions about customers, products, orders, reviews, and
inventory. Try asking something like \"show me the top 5 products by
revenue\" or \"how many orders were placed last month\".";
