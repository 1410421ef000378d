use std::io::Write;

use garage_config::{load_path, load_toml};
use rstest::rstest;

const FULL: &str = r#"
name = "Workshop"

[pins]
open = 17
close = 17
state = 27

[output]
emit_ms = 300
reverse = true

[timing]
execution_s = 12
opening_delay_s = 9

[control]
allow_command_override = true

[input]
enabled = true
reverse = false

[auto_close]
enabled = true
delay_s = 30
virtual_opening_delay_s = 120

[webhook]
enabled = true
port = 8088
path = "/hooks/garage"
json_path = "$.door.open"
value_reverse = false

[storage]
dir = "/tmp/garage"

[logging]
rotation = "daily"
"#;

#[test]
fn accepts_full_config() {
    let cfg = load_toml(FULL).expect("parse TOML");
    cfg.validate().expect("valid config should pass");
    assert_eq!(cfg.name, "Workshop");
    assert_eq!(cfg.pins.state, Some(27));
    assert!(cfg.output.reverse);
    assert_eq!(cfg.auto_close.virtual_opening_delay_s, 120);
    assert_eq!(cfg.webhook.json_path, "$.door.open");
}

#[test]
fn missing_pins_section_is_a_parse_error() {
    assert!(load_toml("[output]\nemit_ms = 100\n").is_err());
}

#[rstest]
#[case("[pins]\nopen = 17\nclose = 18\n", "pins.close")]
#[case("[pins]\nopen = 17\n[input]\nenabled = true\n", "pins.state is missing")]
#[case("[pins]\nopen = 17\nstate = 17\n[input]\nenabled = true\n", "must differ")]
#[case("[pins]\nopen = 17\n[output]\nemit_ms = 0\n", "emit_ms must be >= 1")]
#[case("[pins]\nopen = 17\n[output]\nemit_ms = 60000\n", "emit_ms is unreasonably large")]
#[case("[pins]\nopen = 17\n[timing]\nexecution_s = 0\n", "execution_s must be >= 1")]
#[case("[pins]\nopen = 17\n[timing]\nopening_delay_s = 0\n", "opening_delay_s")]
#[case("[pins]\nopen = 17\n[auto_close]\nenabled = true\ndelay_s = 0\n", "auto_close.delay_s")]
#[case("[pins]\nopen = 17\n[timing]\nexecution_s = 9223372036854775807\n", "execution_s is unreasonably large")]
#[case("[pins]\nopen = 17\n[timing]\nopening_delay_s = 86401\n", "opening_delay_s is unreasonably large")]
#[case("[pins]\nopen = 17\n[auto_close]\nenabled = true\ndelay_s = 86401\n", "auto_close.delay_s is unreasonably large")]
#[case("[pins]\nopen = 17\n[auto_close]\nenabled = true\nvirtual_opening_delay_s = 86401\n", "virtual_opening_delay_s is unreasonably large")]
#[case("[pins]\nopen = 17\n[webhook]\nenabled = true\nport = 0\n", "webhook.port")]
#[case("[pins]\nopen = 17\n[webhook]\nenabled = true\npath = \"garage\"\n", "webhook.path")]
#[case("[pins]\nopen = 17\n[webhook]\nenabled = true\njson_path = \"$[\"\n", "json_path")]
#[case("[pins]\nopen = 17\n[storage]\ndir = \"  \"\n", "storage.dir")]
#[case("[pins]\nopen = 17\n[logging]\nrotation = \"weekly\"\n", "logging.rotation")]
fn rejects_invalid(#[case] toml: &str, #[case] needle: &str) {
    let cfg = load_toml(toml).expect("parse TOML");
    let err = cfg.validate().expect_err("should be rejected");
    let msg = format!("{err}");
    assert!(msg.contains(needle), "expected {needle:?} in {msg:?}");
}

#[test]
fn one_day_delays_are_accepted() {
    let cfg = load_toml(
        "[pins]\nopen = 17\n[timing]\nexecution_s = 86400\nopening_delay_s = 86400\n\
         [auto_close]\nenabled = true\ndelay_s = 86400\nvirtual_opening_delay_s = 86400\n",
    )
    .expect("parse");
    cfg.validate().expect("one day is the upper bound, inclusive");
}

#[test]
fn disabled_webhook_skips_its_checks() {
    let cfg = load_toml("[pins]\nopen = 17\n[webhook]\nport = 0\npath = \"x\"\n").expect("parse");
    cfg.validate().expect("webhook off: its settings are not checked");
}

#[test]
fn load_path_parses_and_validates() {
    let dir = tempfile::tempdir().unwrap();
    let good = dir.path().join("good.toml");
    std::fs::write(&good, FULL).unwrap();
    assert_eq!(load_path(&good).expect("valid").pins.open, 17);

    let bad = dir.path().join("bad.toml");
    let mut f = std::fs::File::create(&bad).unwrap();
    writeln!(f, "[pins]\nopen = 17\nclose = 4").unwrap();
    let err = load_path(&bad).expect_err("close pin differs");
    assert!(format!("{err}").contains("pins.close"));

    let missing = dir.path().join("nope.toml");
    assert!(format!("{}", load_path(&missing).unwrap_err()).contains("read config"));
}
