//! Built-in playground catalog.
//!
//! Rust renditions of the twelve study days, registered in day order and
//! tagged `dayN` plus a topic. Snippets with deterministic output carry a
//! fixture; the rest only demonstrate and pass on normal completion.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Display;
use std::path::Path;
use std::rc::Rc;

use snipcheck_core::{Fixture, Output, Result, SnippetRegistry};
use tracing::debug;

/// Build the catalog, preferring `<fixtures_dir>/<id>.expected` files over
/// the built-in fixtures when present.
pub fn build(fixtures_dir: Option<&Path>) -> Result<SnippetRegistry> {
    let mut catalog = Catalog {
        registry: SnippetRegistry::new(),
        fixtures_dir,
    };
    day1(&mut catalog)?;
    day2(&mut catalog)?;
    day3(&mut catalog)?;
    day4(&mut catalog)?;
    day5(&mut catalog)?;
    day6_7(&mut catalog)?;
    day8(&mut catalog)?;
    day9(&mut catalog)?;
    day10(&mut catalog)?;
    day11(&mut catalog)?;
    day12(&mut catalog)?;
    Ok(catalog.registry)
}

struct Catalog<'a> {
    registry: SnippetRegistry,
    fixtures_dir: Option<&'a Path>,
}

impl Catalog<'_> {
    fn add<F>(&mut self, id: &str, tags: &[&str], expected: Option<&[&str]>, body: F) -> Result<()>
    where
        F: Fn(&mut Output) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let fixture = match self.fixture_override(id)? {
            Some(fixture) => Some(fixture),
            None => expected.map(|lines| Fixture::from_lines(lines.iter().copied())),
        };
        self.registry.register(id, body, fixture, tags)?;
        Ok(())
    }

    fn fixture_override(&self, id: &str) -> Result<Option<Fixture>> {
        let Some(dir) = self.fixtures_dir else {
            return Ok(None);
        };
        let path = dir.join(format!("{id}.expected"));
        if !path.is_file() {
            return Ok(None);
        }
        debug!(snippet = %id, path = %path.display(), "Using fixture override");
        Fixture::load(path).map(Some)
    }
}

fn day1(c: &mut Catalog<'_>) -> Result<()> {
    c.add(
        "day1.variables",
        &["day1", "variables"],
        Some(&["Hi", "10000", "10"]),
        |out| {
            let mut greeting = String::from("Hello");
            greeting = greeting.replace("Hello", "Hi");
            let max_limit = 10_000;
            let min_limit: i32;
            min_limit = 10;
            out.line(greeting);
            out.line(max_limit);
            out.line(min_limit);
            Ok(())
        },
    )?;

    c.add(
        "day1.strings",
        &["day1", "strings"],
        Some(&[
            "2",
            "Buddy, you're a boy, make a big noise",
            "Your score was 85",
            "123456789",
        ]),
        |out| {
            let lyrics = "Buddy, you're a boy, make a big noise
Playing in the street, gonna be a big man someday";
            let joined = "Buddy, you're a boy, \
                          make a big noise";
            let score = 85;
            let population = 123_456_789;
            out.line(lyrics.lines().count());
            out.line(joined);
            out.line(format!("Your score was {score}"));
            out.line(population);
            Ok(())
        },
    )?;

    c.add("day1.doubles_booleans", &["day1", "types"], None, |out| {
        let a_double = 1.234_567_890_123_456_8_f64;
        let mut is_logged_in = true;
        is_logged_in = !is_logged_in;
        out.line(a_double);
        out.line(is_logged_in);
        Ok(())
    })
}

fn day2(c: &mut Catalog<'_>) -> Result<()> {
    c.add(
        "day2.collections",
        &["day2", "collections"],
        Some(&["Paul", "1.78", "3", "Taylor"]),
        |out| {
            let beatles = ["John", "Paul", "George", "Ringo"];
            let heights = BTreeMap::from([("Taylor Swift", 1.78), ("Ed Sheeran", 1.73)]);
            let colors: BTreeSet<&str> = ["red", "green", "blue", "red"].into_iter().collect();
            let name = ("Taylor", "Swift");
            out.line(beatles[1]);
            out.line(heights["Taylor Swift"]);
            out.line(colors.len());
            out.line(name.0);
            Ok(())
        },
    )?;

    #[derive(Clone, Copy)]
    enum SocialPlatform {
        Twitter,
        Facebook,
        Instagram,
        LinkedIn,
    }

    impl SocialPlatform {
        const ALL: [SocialPlatform; 4] = [
            SocialPlatform::Twitter,
            SocialPlatform::Facebook,
            SocialPlatform::Instagram,
            SocialPlatform::LinkedIn,
        ];

        fn raw_value(self) -> &'static str {
            match self {
                SocialPlatform::Twitter => "My favorite!",
                SocialPlatform::Facebook => "I never use this.",
                SocialPlatform::Instagram => "I don't have an account",
                SocialPlatform::LinkedIn => "I need to start posting here.",
            }
        }
    }

    c.add(
        "day2.enums",
        &["day2", "enums"],
        Some(&[
            "4",
            "My favorite!",
            "I never use this.",
            "I don't have an account",
            "I need to start posting here.",
        ]),
        |out| {
            out.line(SocialPlatform::ALL.len());
            for platform in SocialPlatform::ALL {
                out.line(platform.raw_value());
            }
            Ok(())
        },
    )?;

    enum SocialMediaPlatform {
        Twitter { followers: u32 },
        Youtube { subscribers: u32 },
        #[allow(dead_code)]
        Instagram,
    }

    fn sponsorship(platform: &SocialMediaPlatform) -> &'static str {
        match platform {
            SocialMediaPlatform::Twitter { followers } if *followers > 10_000 => {
                "Eligible for sponsored Tweet."
            }
            SocialMediaPlatform::Youtube { subscribers } if *subscribers > 25_000 => {
                "Eligible for sponsored video."
            }
            _ => "Not eligible for sponsorship",
        }
    }

    c.add(
        "day2.associated_values",
        &["day2", "enums"],
        Some(&[
            "Not eligible for sponsorship",
            "Eligible for sponsored video.",
            "Eligible for sponsored Tweet.",
        ]),
        |out| {
            for platform in [
                SocialMediaPlatform::Twitter { followers: 954 },
                SocialMediaPlatform::Youtube {
                    subscribers: 30_000,
                },
                SocialMediaPlatform::Twitter { followers: 20_000 },
            ] {
                out.line(sponsorship(&platform));
            }
            Ok(())
        },
    )
}

fn day3(c: &mut Catalog<'_>) -> Result<()> {
    c.add(
        "day3.operators",
        &["day3", "operators"],
        Some(&["16", "8", "48", "3", "1", "Fakers gonna fake", "90"]),
        |out| {
            let first_score = 12;
            let second_score = 4;
            out.line(first_score + second_score);
            out.line(first_score - second_score);
            out.line(first_score * second_score);
            out.line(first_score / second_score);
            out.line(13 % second_score);

            let meaning = String::from("Fakers gonna ") + "fake";
            out.line(meaning);

            let mut score = 95;
            score -= 5;
            out.line(score);
            Ok(())
        },
    )?;

    c.add(
        "day3.conditions",
        &["day3", "conditions"],
        Some(&["Blackjack!", "Wear sunscreen", "You did great!"]),
        |out| {
            let (first_card, second_card) = (11, 10);
            if first_card + second_card == 21 {
                out.line("Blackjack!");
            }

            let weather = "sunny";
            out.line(match weather {
                "rain" => "Bring an umbrella",
                "snow" => "Wrap up warm",
                "sunny" => "Wear sunscreen",
                _ => "Enjoy your day!",
            });

            let score = 85;
            out.line(match score {
                0..=49 => "You failed badly.",
                50..=84 => "You did OK.",
                _ => "You did great!",
            });
            Ok(())
        },
    )
}

fn day4(c: &mut Catalog<'_>) -> Result<()> {
    c.add(
        "day4.loops",
        &["day4", "loops"],
        Some(&["1", "2", "3", "Players gonna", "Play", "Play"]),
        |out| {
            for i in 1..=3 {
                out.line(i);
            }
            out.line("Players gonna");
            for _ in 1..=2 {
                out.line("Play");
            }
            Ok(())
        },
    )?;

    c.add(
        "day4.continue_break",
        &["day4", "loops"],
        Some(&["8", "7", "5", "I'm bored. Let's go now!"]),
        |out| {
            let mut countdown = 10;
            while countdown > 0 {
                countdown -= 1;
                if countdown % 3 == 0 {
                    continue;
                }
                if countdown == 4 {
                    out.line("I'm bored. Let's go now!");
                    break;
                }
                out.line(countdown);
            }
            Ok(())
        },
    )?;

    c.add(
        "day4.labelled_break",
        &["day4", "loops"],
        Some(&["5 * 10 is 50", "It's a bullseye!"]),
        |out| {
            'outer: for i in 1..=10 {
                for j in 1..=10 {
                    let product = i * j;
                    if product == 50 {
                        out.line(format!("{i} * {j} is {product}"));
                        out.line("It's a bullseye!");
                        break 'outer;
                    }
                }
            }
            Ok(())
        },
    )?;

    c.add(
        "day4.infinite_loop",
        &["day4", "loops"],
        Some(&["273"]),
        |out| {
            let mut counter = 0;
            loop {
                counter += 1;
                if counter == 273 {
                    break;
                }
            }
            out.line(counter);
            Ok(())
        },
    )
}

fn day5(c: &mut Catalog<'_>) -> Result<()> {
    fn greet(person: &str, nicely: bool) -> String {
        if nicely {
            format!("Hello, {person}!")
        } else {
            format!("Oh no, it's {person} again...")
        }
    }

    c.add(
        "day5.functions",
        &["day5", "functions"],
        Some(&[
            "Hello World!",
            "25",
            "Hello, Taylor!",
            "Oh no, it's Taylor again...",
        ]),
        |out| {
            let square = |number: i32| number * number;
            out.line("Hello World!");
            out.line(square(5));
            out.line(greet("Taylor", true));
            out.line(greet("Taylor", false));
            Ok(())
        },
    )?;

    c.add(
        "day5.variadic",
        &["day5", "functions"],
        Some(&["1", "4", "9", "16", "25"]),
        |out| {
            fn square_all(out: &mut Output, numbers: &[i32]) {
                for n in numbers {
                    out.line(n * n);
                }
            }
            square_all(out, &[1, 2, 3, 4, 5]);
            Ok(())
        },
    )?;

    #[derive(Debug)]
    enum PasswordError {
        Obvious,
        TooShort,
    }

    fn check_password(password: &str) -> std::result::Result<&'static str, PasswordError> {
        if password == "123456" {
            return Err(PasswordError::Obvious);
        }
        match password.chars().count() {
            0..=5 => Err(PasswordError::TooShort),
            6..=7 => Ok("OK"),
            _ => Ok("Perfect"),
        }
    }

    c.add(
        "day5.error_returning_functions",
        &["day5", "errors"],
        Some(&[
            "Password shouldn't contain consecutive numbers.",
            "Password should be minimum 6 characters",
            "Password Rating: OK",
            "Password Rating: Perfect",
        ]),
        |out| {
            for candidate in ["123456", "abc", "abcdefg", "abcdefghi"] {
                match check_password(candidate) {
                    Ok(rating) => out.line(format!("Password Rating: {rating}")),
                    Err(PasswordError::TooShort) => {
                        out.line("Password should be minimum 6 characters")
                    }
                    Err(PasswordError::Obvious) => {
                        out.line("Password shouldn't contain consecutive numbers.")
                    }
                }
            }
            Ok(())
        },
    )?;

    c.add(
        "day5.mutable_references",
        &["day5", "functions"],
        Some(&["11"]),
        |out| {
            fn change_the_score(score: &mut i32) {
                *score += 1;
            }
            let mut my_score = 10;
            change_the_score(&mut my_score);
            out.line(my_score);
            Ok(())
        },
    )
}

fn day6_7(c: &mut Catalog<'_>) -> Result<()> {
    c.add(
        "day6.closures",
        &["day6", "closures"],
        Some(&[
            "I'm going to London in my car",
            "I'm getting ready to go.",
            "I'm driving in my car",
            "I arrived!",
        ]),
        |out| {
            let driving = |place: &str| format!("I'm going to {place} in my car");
            out.line(driving("London"));

            fn travel(out: &mut Output, action: impl Fn() -> String) {
                out.line("I'm getting ready to go.");
                out.line(action());
                out.line("I arrived!");
            }
            travel(out, || "I'm driving in my car".to_string());
            Ok(())
        },
    )?;

    c.add(
        "day7.capturing_values",
        &["day7", "closures"],
        Some(&[
            "I'm going to London (1)",
            "I'm going to London (2)",
            "I'm going to London (3)",
        ]),
        |out| {
            fn travel() -> impl FnMut(&str) -> String {
                let mut counter = 0;
                move |place: &str| {
                    counter += 1;
                    format!("I'm going to {place} ({counter})")
                }
            }
            let mut trip = travel();
            for _ in 0..3 {
                out.line(trip("London"));
            }
            Ok(())
        },
    )?;

    c.add(
        "day7.closure_parameters",
        &["day7", "closures"],
        Some(&["2, 4, 6", "London: 300 miles", "12"]),
        |out| {
            let doubled: Vec<String> = [1, 2, 3].iter().map(|n| (n * 2).to_string()).collect();
            out.line(doubled.join(", "));

            let describe = |place: &str, miles: u32| format!("{place}: {miles} miles");
            out.line(describe("London", 300));

            let total = [3, 4, 5].iter().fold(0, |acc, n| acc + n);
            out.line(total);
            Ok(())
        },
    )
}

fn day8(c: &mut Catalog<'_>) -> Result<()> {
    struct Sport {
        name: &'static str,
        is_olympic: bool,
    }

    impl Sport {
        fn olympic_status(&self) -> String {
            if self.is_olympic {
                format!("{} is an Olympic sport", self.name)
            } else {
                format!("{} is not an Olympic sport", self.name)
            }
        }
    }

    c.add(
        "day8.computed_properties",
        &["day8", "structs"],
        Some(&[
            "Chessboxing is not an Olympic sport",
            "Tennis is an Olympic sport",
        ]),
        |out| {
            let sports = [
                Sport {
                    name: "Chessboxing",
                    is_olympic: false,
                },
                Sport {
                    name: "Tennis",
                    is_olympic: true,
                },
            ];
            for sport in &sports {
                out.line(sport.olympic_status());
            }
            Ok(())
        },
    )?;

    c.add(
        "day8.property_observers",
        &["day8", "structs"],
        Some(&["Score is now 10", "Score is now 6", "Score is now 6"]),
        |out| {
            struct Game {
                score: i32,
            }

            impl Game {
                fn set_score(&mut self, out: &mut Output, score: i32) {
                    self.score = score;
                    out.line(format!("Score is now {}", self.score));
                }
            }

            let mut game = Game { score: 0 };
            game.set_score(out, game.score + 10);
            game.set_score(out, game.score - 4);
            game.set_score(out, game.score);
            Ok(())
        },
    )
}

mod bank {
    pub struct BankAccount {
        funds: u32,
    }

    impl BankAccount {
        pub fn new() -> Self {
            Self { funds: 0 }
        }

        pub fn deposit(&mut self, amount: u32) {
            self.funds += amount;
        }

        pub fn withdraw(&mut self, amount: u32) -> bool {
            if self.funds >= amount {
                self.funds -= amount;
                true
            } else {
                false
            }
        }

        pub fn funds(&self) -> u32 {
            self.funds
        }
    }
}

fn day9(c: &mut Catalog<'_>) -> Result<()> {
    c.add(
        "day9.access_control",
        &["day9", "access_control"],
        Some(&[
            "Withdrew money successfully",
            "Failed to get the money",
            "50",
        ]),
        |out| {
            let mut account = bank::BankAccount::new();
            account.deposit(100);
            for amount in [50, 500] {
                if account.withdraw(amount) {
                    out.line("Withdrew money successfully");
                } else {
                    out.line("Failed to get the money");
                }
            }
            out.line(account.funds());
            Ok(())
        },
    )?;

    c.add(
        "day9.statics",
        &["day9", "statics"],
        Some(&["Taylor's School", "App version 1.3 beta 2"]),
        |out| {
            struct School;
            impl School {
                const NAME: &'static str = "Taylor's School";
            }
            struct AppData;
            impl AppData {
                const VERSION: &'static str = "1.3 beta 2";
            }
            out.line(School::NAME);
            out.line(format!("App version {}", AppData::VERSION));
            Ok(())
        },
    )
}

fn day10(c: &mut Catalog<'_>) -> Result<()> {
    c.add(
        "day10.shared_ownership",
        &["day10", "classes"],
        Some(&["Taylor", "Taylor", "Jane"]),
        |out| {
            #[derive(Clone)]
            struct User {
                username: String,
            }

            let user1 = Rc::new(RefCell::new(User {
                username: "Anonymous".to_string(),
            }));
            let user2 = Rc::clone(&user1);
            user2.borrow_mut().username = "Taylor".to_string();
            out.line(&user1.borrow().username);

            let mut copy = user1.borrow().clone();
            copy.username = "Jane".to_string();
            out.line(&user1.borrow().username);
            out.line(&copy.username);
            Ok(())
        },
    )?;

    trait Employee {
        fn hours(&self) -> u32;
        fn work(&self) -> String;

        fn summary(&self) -> String {
            format!("I work {} hours a day.", self.hours())
        }
    }

    struct Developer;
    struct Manager;

    impl Employee for Developer {
        fn hours(&self) -> u32 {
            8
        }
        fn work(&self) -> String {
            format!("I'm writing code for {} hours.", self.hours())
        }
    }

    impl Employee for Manager {
        fn hours(&self) -> u32 {
            10
        }
        fn work(&self) -> String {
            format!("I'm going to meetings for {} hours.", self.hours())
        }
    }

    c.add(
        "day10.inheritance",
        &["day10", "classes", "traits"],
        Some(&[
            "I'm writing code for 8 hours.",
            "I work 8 hours a day.",
            "I'm going to meetings for 10 hours.",
            "I work 10 hours a day.",
        ]),
        |out| {
            let staff: [Box<dyn Employee>; 2] = [Box::new(Developer), Box::new(Manager)];
            for employee in &staff {
                out.line(employee.work());
                out.line(employee.summary());
            }
            Ok(())
        },
    )?;

    c.add(
        "day10.drop_hooks",
        &["day10", "classes"],
        Some(&[
            "User 1: I'm alive!",
            "User 1: I'm dead!",
            "User 2: I'm alive!",
            "User 2: I'm dead!",
            "User 3: I'm alive!",
            "User 3: I'm dead!",
        ]),
        |out| {
            struct User {
                id: u32,
                out: Output,
            }

            impl Drop for User {
                fn drop(&mut self) {
                    self.out.line(format!("User {}: I'm dead!", self.id));
                }
            }

            for id in 1..=3 {
                let mut user = User {
                    id,
                    out: out.clone(),
                };
                user.out.line(format!("User {}: I'm alive!", user.id));
            }
            Ok(())
        },
    )
}

fn day11(c: &mut Catalog<'_>) -> Result<()> {
    trait Vehicle {
        fn name(&self) -> &'static str;
        fn estimate_time(&self, distance: u32) -> u32;
        fn travel(&self, distance: u32) -> String;
    }

    struct Car;
    struct Bicycle;

    impl Vehicle for Car {
        fn name(&self) -> &'static str {
            "Car"
        }
        fn estimate_time(&self, distance: u32) -> u32 {
            distance / 50
        }
        fn travel(&self, distance: u32) -> String {
            format!("I'm driving {distance}km.")
        }
    }

    impl Vehicle for Bicycle {
        fn name(&self) -> &'static str {
            "Bicycle"
        }
        fn estimate_time(&self, distance: u32) -> u32 {
            distance / 10
        }
        fn travel(&self, distance: u32) -> String {
            format!("I'm cycling {distance}km.")
        }
    }

    fn commute(distance: u32, vehicle: &dyn Vehicle) -> String {
        if vehicle.estimate_time(distance) > 100 {
            "That's too slow! I'll try a different vehicle.".to_string()
        } else {
            vehicle.travel(distance)
        }
    }

    c.add(
        "day11.protocols",
        &["day11", "traits"],
        Some(&[
            "I'm driving 100km.",
            "I'm cycling 50km.",
            "That's too slow! I'll try a different vehicle.",
            "Car: 1 hours to travel 50km",
            "Bicycle: 5 hours to travel 50km",
        ]),
        |out| {
            out.line(commute(100, &Car));
            out.line(commute(50, &Bicycle));
            out.line(commute(2_000, &Bicycle));
            let vehicles: [&dyn Vehicle; 2] = [&Car, &Bicycle];
            for vehicle in vehicles {
                let hours = vehicle.estimate_time(50);
                out.line(format!("{}: {hours} hours to travel 50km", vehicle.name()));
            }
            Ok(())
        },
    )?;

    trait StrExt {
        fn trimmed(&self) -> String;
        fn line_count(&self) -> usize;
    }

    impl StrExt for str {
        fn trimmed(&self) -> String {
            self.trim().to_string()
        }
        fn line_count(&self) -> usize {
            self.lines().count()
        }
    }

    trait IsEven {
        fn is_even(&self) -> bool;
    }

    impl IsEven for i32 {
        fn is_even(&self) -> bool {
            self % 2 == 0
        }
    }

    c.add(
        "day11.extensions",
        &["day11", "traits"],
        Some(&["The truth is rarely pure and never simple", "2", "true"]),
        |out| {
            let quote = "   The truth is rarely pure and never simple   ";
            let lyrics = "But I keep cruising\nCan't stop, won't stop moving";
            out.line(quote.trimmed());
            out.line(lyrics.line_count());
            out.line(4_i32.is_even());
            Ok(())
        },
    )?;

    fn favorite_number() -> impl Display {
        21 * 2
    }

    c.add("day11.opaque_return", &["day11", "traits"], None, |out| {
        out.line(favorite_number());
        Ok(())
    })
}

fn day12(c: &mut Catalog<'_>) -> Result<()> {
    c.add(
        "day12.optionals",
        &["day12", "optionals"],
        Some(&["Mario's opposite is Wario", "The optional was empty."]),
        |out| {
            let opposites = BTreeMap::from([("Mario", "Wario"), ("Luigi", "Waluigi")]);
            if opposites.get("Peach").is_none() {
                if let Some(mario_opposite) = opposites.get("Mario") {
                    out.line(format!("Mario's opposite is {mario_opposite}"));
                }
            }

            let username: Option<&str> = None;
            match username {
                Some(name) => out.line(format!("We got a user: {name}")),
                None => out.line("The optional was empty."),
            }
            Ok(())
        },
    )?;

    c.add(
        "day12.let_else",
        &["day12", "optionals"],
        Some(&["Missing input", "3 x 3 is 9"]),
        |out| {
            fn print_square(out: &mut Output, number: Option<i32>) {
                let Some(number) = number else {
                    out.line("Missing input");
                    return;
                };
                out.line(format!("{number} x {number} is {}", number * number));
            }
            print_square(out, None);
            print_square(out, Some(3));
            Ok(())
        },
    )?;

    c.add(
        "day12.defaults",
        &["day12", "optionals"],
        Some(&["N/A", "5", "0"]),
        |out| {
            let captains = BTreeMap::from([("Enterprise", "Picard"), ("Voyager", "Janeway")]);
            out.line(captains.get("Serenity").copied().unwrap_or("N/A"));
            out.line("5".parse::<i32>().unwrap_or(0));
            out.line("five".parse::<i32>().unwrap_or(0));
            Ok(())
        },
    )?;

    c.add(
        "day12.chaining",
        &["day12", "optionals"],
        Some(&["No one", "ROBB"]),
        |out| {
            let names = ["Arya", "Bran", "Robb", "Sansa"];
            for initial in ['Z', 'R'] {
                let chosen = names
                    .iter()
                    .find(|n| n.starts_with(initial))
                    .map(|n| n.to_uppercase())
                    .unwrap_or_else(|| "No one".to_string());
                out.line(chosen);
            }
            Ok(())
        },
    )?;

    c.add(
        "day12.question_mark",
        &["day12", "optionals", "errors"],
        Some(&["User not found", "Hello, Taylor"]),
        |out| {
            fn user_name(id: u32) -> std::result::Result<&'static str, String> {
                match id {
                    1 => Ok("Taylor"),
                    _ => Err(format!("no user with id {id}")),
                }
            }

            fn greeting(id: u32) -> Option<String> {
                let name = user_name(id).ok()?;
                Some(format!("Hello, {name}"))
            }

            for id in [23, 1] {
                out.line(greeting(id).unwrap_or_else(|| "User not found".to_string()));
            }
            Ok(())
        },
    )
}
