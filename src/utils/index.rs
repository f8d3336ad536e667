/// Token amounts are integers of smallest units, displayed with this many decimals
pub const TOKEN_DECIMALS: u32 = 8;

pub fn format_units(amount: u64, decimals: u32) -> String {
	if decimals == 0 {
		return amount.to_string();
	}
	let scale = 10u64.pow(decimals);
	format!(
		"{}.{:0width$}",
		amount / scale,
		amount % scale,
		width = decimals as usize
	)
}

pub fn format_token_amount(amount: u64) -> String {
	format_units(amount, TOKEN_DECIMALS)
}
