//! Demo seeding — four starter apps, each with a root endpoint test.

use tracing::info;

use vigil_state::{HttpMethod, NewApp, NewTest, StateStore, epoch_secs};

/// Name, icon, and root-test URL for each demo app.
const DEMO_APPS: [(&str, &str, &str); 4] = [
    (
        "Eatery",
        "https://github.com/cuappdev/assets/blob/master/app-icons/Eatery-83.5x83.5%402x.png",
        "http://eatery-backend.cornellappdev.com/api/v1/",
    ),
    (
        "Uplift",
        "https://github.com/cuappdev/assets/blob/master/app-icons/Uplift-83.5x83.5%402x.png",
        "http://uplift-backend.cornellappdev.com/api/v1/",
    ),
    (
        "Transit",
        "https://github.com/cuappdev/assets/blob/master/app-icons/Transit-83.5x83.5%402x.png",
        "http://transit-backend.cornellappdev.com/api/v1/",
    ),
    (
        "Pollo",
        "https://github.com/cuappdev/assets/blob/master/app-icons/pollo-1024%401x.png",
        "http://pollo-backend.cornellappdev.com/api/v1/",
    ),
];

/// Populate an empty store with the demo apps. Returns whether seeding
/// happened; a store that already holds any app is left untouched.
pub fn seed_if_empty(store: &StateStore) -> anyhow::Result<bool> {
    if !store.list_apps()?.is_empty() {
        return Ok(false);
    }
    let now = epoch_secs();
    for (name, icon, url) in DEMO_APPS {
        let app = store.create_app(
            &NewApp {
                name: name.to_string(),
                icon: icon.to_string(),
            },
            now,
        )?;
        let _ = store.create_test(
            app.id,
            &NewTest {
                name: "Root Test".to_string(),
                url: url.to_string(),
                method: HttpMethod::Get,
                parameters: String::new(),
                graphql: false,
            },
            now,
        )?;
    }
    info!(apps = DEMO_APPS.len(), "seeded demo apps");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeds_empty_store_once() {
        let store = StateStore::open_in_memory().unwrap();

        assert!(seed_if_empty(&store).unwrap());
        let apps = store.list_apps().unwrap();
        assert_eq!(apps.len(), 4);
        for app in &apps {
            assert_eq!(store.list_tests_for_app(app.id).unwrap().len(), 1);
        }

        // Second run is a no-op.
        assert!(!seed_if_empty(&store).unwrap());
        assert_eq!(store.list_apps().unwrap().len(), 4);
    }

    #[test]
    fn leaves_populated_store_alone() {
        let store = StateStore::open_in_memory().unwrap();
        store
            .create_app(
                &NewApp {
                    name: "mine".to_string(),
                    icon: "https://icons.example/mine.png".to_string(),
                },
                1000,
            )
            .unwrap();

        assert!(!seed_if_empty(&store).unwrap());
        assert_eq!(store.list_apps().unwrap().len(), 1);
    }
}
