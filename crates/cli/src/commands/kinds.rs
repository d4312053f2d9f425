use anyhow::Result;
use serde_json::json;
use sessionbridge::SessionKind;

pub(super) fn print_kinds() -> Result<()> {
	for kind in SessionKind::ALL {
		let line = json!({
			"tag": kind.tag(),
			"entryPoint": format!("{:?}", kind.entry_point()),
			"referencePolicy": format!("{:?}", kind.reference_policy()),
		});
		println!("{}", serde_json::to_string(&line)?);
	}
	Ok(())
}
