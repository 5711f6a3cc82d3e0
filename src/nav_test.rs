use super::*;

#[test]
fn parse_splits_path_and_query() {
    let loc = Location::parse("/profile/42?ref=x");
    assert_eq!(loc.path, "/profile/42");
    assert_eq!(loc.query, "?ref=x");
    assert_eq!(loc.href(), "/profile/42?ref=x");
}

#[test]
fn parse_drops_fragment_and_empty_query() {
    assert_eq!(Location::parse("/inbox?#top"), Location::new("/inbox", ""));
    assert_eq!(Location::parse("/inbox#top"), Location::new("/inbox", ""));
}

#[test]
fn new_normalizes_missing_question_mark() {
    assert_eq!(Location::new("/feed", "page=2").query, "?page=2");
}

#[test]
fn replace_navigation_rewrites_current_entry() {
    let history = MemoryHistory::starting_at("/inbox");
    history.navigate("/login", NavigateOptions::replace());
    assert_eq!(history.entries(), vec!["/login".to_owned()]);
    assert_eq!(history.calls(), vec![NavigationRecord { to: "/login".into(), replace: true }]);
}

#[test]
fn push_navigation_keeps_back_entry() {
    let history = MemoryHistory::starting_at("/feed");
    history.navigate("/m/dj_amy", NavigateOptions::default());
    assert_eq!(history.entries(), vec!["/feed".to_owned(), "/m/dj_amy".to_owned()]);
    assert_eq!(history.current().as_deref(), Some("/m/dj_amy"));
}

#[test]
fn fn_navigator_forwards_calls() {
    let seen = Mutex::new(Vec::new());
    let nav = FnNavigator(|to: &str, opts: NavigateOptions| {
        seen.lock().expect("lock").push((to.to_owned(), opts.replace));
    });
    nav.navigate("/admin/login", NavigateOptions::replace());
    assert_eq!(seen.lock().expect("lock").as_slice(), &[("/admin/login".to_owned(), true)]);
}
