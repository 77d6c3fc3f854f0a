/// Returns whether `number` is a non-empty digit string passing the Luhn check.
///
/// Counting from the right, every second digit starting with the one left of
/// the check digit is doubled (minus 9 when above 9); the number is valid when
/// the digit sum is divisible by 10.
pub fn is_valid(number: &str) -> bool {
    if number.is_empty() {
        return false;
    }
    let parity = number.len() % 2;
    let mut sum = 0u32;
    for (i, byte) in number.bytes().enumerate() {
        if !byte.is_ascii_digit() {
            return false;
        }
        let mut digit = u32::from(byte - b'0');
        if i % 2 == parity {
            digit *= 2;
            if digit > 9 {
                digit -= 9;
            }
        }
        sum += digit;
    }
    sum % 10 == 0
}
