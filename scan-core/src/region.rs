//! Service regions

/// Districts a help request can be located in
pub const REGIONS: [&str; 14] = [
    "Thiruvananthapuram",
    "Kollam",
    "Pathanamthitta",
    "Alappuzha",
    "Kottayam",
    "Idukki",
    "Ernakulam",
    "Thrissur",
    "Palakkad",
    "Malappuram",
    "Kozhikode",
    "Wayanad",
    "Kannur",
    "Kasaragod",
];

pub fn is_known_region(name: &str) -> bool {
    REGIONS.contains(&name)
}
