//! Built-in four-round hunt used when no content file is provided.

use super::{Question, QuestionPool, RoundSpec};

fn q(prompt: &str, options: [&str; 4], correct_index: usize) -> Question {
    Question {
        prompt: prompt.into(),
        options: options.into_iter().map(Into::into).collect(),
        correct_index,
        image: None,
        points: None,
    }
}

fn logical_reasoning() -> Vec<Question> {
    vec![
        q(
            "Number Series: 3, 7, 15, 31, 63, ___",
            ["95", "127", "124", "111"],
            1,
        ),
        q(
            "Number Series: 1, 4, 10, 22, 46, ___",
            ["92", "88", "94", "90"],
            2,
        ),
        q(
            "Alphabet Pattern: B, E, I, N, T, ___",
            ["X", "Y", "A", "Z"],
            2,
        ),
        q(
            "Coding-Decoding: If ROAD = URDG, then BOOK = ?",
            ["CQQM", "ERRN", "DRRN", "EQQN"],
            1,
        ),
        q(
            "Direction Sense: A person walks 15m North, then 10m East, then 15m South. Where is he from the starting point?",
            ["15m East", "10m East", "10m West", "15m North"],
            1,
        ),
        q(
            "Blood Relation: Pointing to a woman, Ramesh said, 'She is the daughter of my grandfather's only son.' How is the woman related to Ramesh?",
            ["Cousin", "Aunt", "Sister", "Mother"],
            2,
        ),
        q(
            "Statement & Conclusion: All engineers are graduates. Some graduates are unemployed. Conclusion: Some engineers are unemployed.",
            ["Definitely true", "Definitely false", "Cannot be determined", "None"],
            2,
        ),
        q(
            "Logical Puzzle: If All A are B and All B are C, which is true?",
            ["All C are A", "All A are C", "Some C are A", "None"],
            1,
        ),
        q(
            "Missing Term: 2, 6, 7, 21, 22, 66, ___",
            ["198", "68", "67", "132"],
            2,
        ),
    ]
}

fn verbal_reasoning() -> Vec<Question> {
    vec![
        q(
            "Odd One Out: Pen, Pencil, Eraser, Notebook",
            ["Pen", "Pencil", "Eraser", "Notebook"],
            2,
        ),
        q(
            "Odd One Out: January, March, May, July, September",
            ["January", "May", "July", "September"],
            3,
        ),
        q(
            "\"Once in a blue moon\" means:",
            ["Very often", "Very rarely", "At night", "Twice a month"],
            1,
        ),
        q(
            "\"Under the weather\" means:",
            ["Feeling sick", "Standing in rain", "Feeling happy", "Very busy"],
            0,
        ),
        q(
            "Antonym of \"Optimistic\":",
            ["Positive", "Cheerful", "Pessimistic", "Hopeful"],
            2,
        ),
        q(
            "Antonym of \"Generous\":",
            ["Kind", "Selfish", "Friendly", "Helpful"],
            1,
        ),
        q(
            "Synonym of \"Reluctant\":",
            ["Willing", "Angry", "Unwilling", "Confident"],
            2,
        ),
        q(
            "Synonym of \"Ancient\":",
            ["Modern", "Old", "Future", "Young"],
            1,
        ),
        q(
            "___ Earth revolves around ___ Sun.",
            ["The, the", "A, the", "The, a", "No article, the"],
            0,
        ),
        q(
            "He has ___ MBA degree.",
            ["a", "an", "the", "no article"],
            1,
        ),
    ]
}

fn aptitude() -> Vec<Question> {
    vec![
        q("25% of 200 = ?", ["25", "40", "50", "75"], 2),
        q("15 + 5 × 2 = ?", ["40", "25", "30", "20"], 1),
        q(
            "A train runs at 50 km/hr. Distance covered in 2 hours?",
            ["100 km", "120 km", "80 km", "150 km"],
            0,
        ),
        q("0.5 × 80 = ?", ["20", "30", "40", "50"], 2),
        q(
            "If today is Thursday, what day after 30 days?",
            ["Sunday", "Tuesday", "Monday", "Saturday"],
            3,
        ),
        q("What is 45 ÷ 5 × 2?", ["9", "15", "18", "20"], 2),
        q("Square of 15 = ?", ["225", "215", "205", "235"], 0),
        q("Find the HCF of 36 and 48.", ["6", "12", "18", "24"], 1),
        q(
            "A car travels 60 km in 2 hours. What is its speed?",
            ["30 km/hr", "40 km/hr", "45 km/hr", "50 km/hr"],
            0,
        ),
        q(
            "What is the square of 18?",
            ["324", "328", "320", "340"],
            0,
        ),
        q(
            "If 5 workers complete a work in 10 days, how many days will 10 workers take?",
            ["2", "4", "5", "8"],
            2,
        ),
        q(
            "A train travels 60 km in 40 minutes. How far will it travel in 1.5 hours?",
            ["120 km", "135 km", "150 km", "90 km"],
            1,
        ),
    ]
}

fn tech_riddles() -> Vec<Question> {
    vec![
        q(
            "I speak without a mouth and hear without ears. I have no body, but I come alive with the wind. What am I in tech?",
            ["A microphone", "An echo / Echo service", "A speaker", "Bluetooth"],
            1,
        ),
        Question {
            image: Some("https://i.imgflip.com/65efzo.jpg".into()),
            ..q(
                "This meme shows a developer saying 'It works on my machine' while the server is on fire. What concept does this represent?",
                ["Version control", "Environment inconsistency", "Memory leak", "Syntax error"],
                1,
            )
        },
        q(
            "What design pattern is commonly described as: 'One class to rule them all — only one instance allowed'?",
            ["Factory Pattern", "Observer Pattern", "Singleton Pattern", "Strategy Pattern"],
            2,
        ),
    ]
}

fn rapid_fire() -> Vec<Question> {
    vec![
        q(
            "Keyword: The language used to style web pages.",
            ["HTML", "CSS", "JavaScript", "Python"],
            1,
        ),
        q(
            "Fill in the blank: _____ is the process of finding and fixing bugs in code.",
            ["Compiling", "Debugging", "Deploying", "Refactoring"],
            1,
        ),
        q(
            "True or False: Python is a compiled language.",
            ["True", "False", "Depends on implementation", "Only in Python 2"],
            1,
        ),
        q(
            "Match: 'git push' is related to ___.",
            ["Downloading code", "Uploading code to remote", "Deleting branches", "Creating files"],
            1,
        ),
        q(
            "What does API stand for?",
            [
                "Applied Programming Interface",
                "Application Programming Interface",
                "Application Process Integration",
                "Automated Programming Interface",
            ],
            1,
        ),
    ]
}

fn dsa_challenge() -> Vec<Question> {
    vec![
        Question {
            points: Some(15),
            ..q(
                "You have a sorted array of 1 million elements. Which algorithm gives you O(log n) search time?",
                ["Linear Search", "Binary Search", "Bubble Sort", "BFS"],
                1,
            )
        },
        Question {
            points: Some(20),
            ..q(
                "What is the time complexity of inserting an element at the beginning of a linked list?",
                ["O(n)", "O(log n)", "O(1)", "O(n²)"],
                2,
            )
        },
    ]
}

/// The stock hunt: four rounds, from warmup reasoning to a DSA finale.
pub fn builtin_rounds() -> Vec<RoundSpec> {
    vec![
        RoundSpec {
            title: "Logic & Aptitude".into(),
            countdown_secs: 120,
            points_per_question: 10,
            gate_secret: "glitch_protocol_start".into(),
            hint: "🏛️ Head to the library entrance — look near the notice board on the left side."
                .into(),
            pools: vec![
                QuestionPool {
                    salt: "logical".into(),
                    picks: 1,
                    questions: logical_reasoning(),
                },
                QuestionPool {
                    salt: "verbal".into(),
                    picks: 1,
                    questions: verbal_reasoning(),
                },
                QuestionPool {
                    salt: "aptitude".into(),
                    picks: 1,
                    questions: aptitude(),
                },
            ],
        },
        RoundSpec {
            title: "Tech Riddles".into(),
            countdown_secs: 150,
            points_per_question: 15,
            gate_secret: "echo_silence_break".into(),
            hint: "🌳 Go to the campus garden — the QR is taped under the third bench.".into(),
            pools: vec![QuestionPool {
                salt: "riddles".into(),
                picks: 3,
                questions: tech_riddles(),
            }],
        },
        RoundSpec {
            title: "Rapid Fire".into(),
            countdown_secs: 45,
            points_per_question: 8,
            gate_secret: "css_style_master".into(),
            hint: "💻 Visit the computer lab — check the whiteboard near the projector.".into(),
            pools: vec![QuestionPool {
                salt: "rapid".into(),
                picks: 5,
                questions: rapid_fire(),
            }],
        },
        RoundSpec {
            title: "Final DSA Challenge".into(),
            countdown_secs: 180,
            points_per_question: 0,
            gate_secret: "binary_search_log_n".into(),
            hint: "🏆 Final stop: Auditorium main door — your destiny awaits!".into(),
            pools: vec![QuestionPool {
                salt: "dsa".into(),
                picks: 2,
                questions: dsa_challenge(),
            }],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn four_rounds_with_expected_hands() {
        let rounds = builtin_rounds();
        assert_eq!(rounds.len(), 4);
        let counts: Vec<usize> = rounds.iter().map(RoundSpec::question_count).collect();
        assert_eq!(counts, [3, 3, 5, 2]);
    }

    #[test]
    fn finale_scores_per_question() {
        let rounds = builtin_rounds();
        let finale = &rounds[3];
        let points: Vec<i32> = finale.pools[0]
            .questions
            .iter()
            .map(|question| finale.question_points(question))
            .collect();
        assert_eq!(points, [15, 20]);
    }

    #[test]
    fn gate_secrets_are_distinct() {
        let rounds = builtin_rounds();
        let mut secrets: Vec<&str> = rounds.iter().map(|r| r.gate_secret.as_str()).collect();
        secrets.sort();
        secrets.dedup();
        assert_eq!(secrets.len(), rounds.len());
    }
}
