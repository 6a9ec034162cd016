//! Daily motivational quote for the home screen.

use chrono::{Datelike, NaiveDate};

const QUOTES: &[&str] = &[
    "Keep Pushing, Never Quit.",
    "Every Step Forward Is Progress.",
    "You Are Stronger Than You Think.",
    "Small Steps Lead To Big Changes.",
    "Consistency Is The Key To Success.",
    "Progress, Not Perfection.",
    "Transform One Day At A Time.",
    "Your Health Is Your Wealth.",
    "Invest In Yourself Daily.",
    "Strong Body, Strong Mind.",
    "Wellness Is A Journey, Not A Destination.",
    "Self-Care Isn't Selfish.",
    "Make Today Count.",
    "Every Day Is A Fresh Start.",
    "Your Future Self Will Thank You.",
    "Glow From The Inside Out.",
    "Change Your Habits, Change Your Life.",
    "Celebrate Every Milestone.",
    "Good Things Take Time.",
    "Trust The Process.",
    "Consistency Beats Intensity.",
    "Be Stronger Than Your Excuses.",
    "Confidence Is The Best Outfit.",
    "Love The Skin You're In.",
    "Sweat Today, Smile Tomorrow.",
    "Eat Better, Feel Better.",
    "Nourish To Flourish.",
    "Level Up Your Life.",
    "Grow Through What You Go Through.",
    "Keep Going. You're Closer Than You Think.",
];

/// Quote for `date`. The same date always yields the same quote.
#[must_use]
pub fn quote_for(date: NaiveDate) -> &'static str {
    let index = usize::try_from(date.ordinal()).unwrap_or_default() % QUOTES.len();
    QUOTES.get(index).copied().unwrap_or_default()
}

/// Quote for today (UTC).
#[must_use]
pub fn daily_quote() -> &'static str {
    quote_for(chrono::Utc::now().date_naive())
}
