use super::*;

#[test]
fn kind_label_follows_prefix() {
    assert_eq!(kind_label("/m/dj_amy"), "Musician");
    assert_eq!(kind_label("/l/sam"), "Listener");
}
