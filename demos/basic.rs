use domain_redirect::{compile, RuleRecord};

fn main() {
    let records = vec![
        RuleRecord::new(1, "https://old.example.com", "https://new.example.org:8443/path"),
        RuleRecord::new(2, "https://paused.example.com", "https://new.example.org").disabled(),
        RuleRecord::new(3, "garbage", "https://new.example.org"),
        RuleRecord::new(4, "http://intranet.local:8080", "https://portal.example.net"),
    ];

    let compiled = compile(&records);
    println!("{compiled}");

    for rule in compiled.rules() {
        println!("  {rule}");
    }
    for err in compiled.skipped() {
        println!("  skipped: {err}");
    }

    let json = serde_json::to_string_pretty(compiled.rules()).expect("rules serialize");
    println!("{json}");
}
