use habitloop_core::Database;
use serde_json::json;

pub fn run(challenge: &str) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let check_ins = db.check_ins(challenge)?;
    let notes = db.notes(challenge)?;
    let output = json!({
        "challenge_id": challenge,
        "days_completed": check_ins.len(),
        "check_ins": check_ins,
        "notes": notes,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
