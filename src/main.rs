use quizmaster::app::QuizApp;
use quizmaster::quiz::ai_helper::{QuizHelper, Tutor};
use quizmaster::quiz::navigation::{Banner, GameState};
use quizmaster::store::SqliteStore;
use quizmaster::{Config, Model, QuizError};
use tokio::io::{AsyncBufReadExt, BufReader};

type App = QuizApp<SqliteStore, QuizHelper, QuizHelper>;

const HELP_TEXT: &str = "Commands:
  courses                      list courses
  course new <name>            create a course and open it
  course open <id>             open a course
  course rename <id> <name>    rename a course
  course delete <id>           delete a course and everything in it
  content add <title> | <text> add material to the open course
  content edit <id> <title> | <text>
  content delete <id>
  quiz <count> [model] <topic> generate a quiz (model: gpt-3.5-turbo, gpt-4, gpt-4o)
  course quiz <count> [model]  generate a quiz from the open course
  answer <n>                   pick option n (1-based)
  hint                         show or hide the hint
  next                         go on to the next question
  chat / ask <text> / endchat  talk to the tutor about the current question
  save                         save and leave the finished quiz
  exit                         leave the quiz early (saved if anything was answered)
  again                        retake the quiz just played
  attempt <id> / retake <quiz id> / back
  setup                        back to quiz setup
  quit";

#[tokio::main]
async fn main() -> Result<(), QuizError> {
    let config = Config::from_env()?;
    pretty_env_logger::init();
    log::info!("Starting quizmaster...");

    log::info!("Opening the database at {}", config.database_url);
    let store = SqliteStore::open(&config.database_url).await?;
    let helper = QuizHelper::new(&config);

    let mut app: App = QuizApp::new(store, helper.clone(), helper.clone(), config.quiz.clone());
    app.show_course_list().await?;
    let mut tutor: Option<Tutor> = None;

    println!("{HELP_TEXT}");
    render(&app);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            Some(event) = app.next_ingest_event(), if app.is_generating() => {
                if let Err(err) = app.apply_ingest_event(event).await {
                    log::debug!("Question generation stopped: {err}");
                }
                render(&app);
            }
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(err) => {
                        log::error!("Could not read from stdin: {err}");
                        break;
                    }
                };
                match handle(&mut app, &helper, &mut tutor, line.trim()).await {
                    Ok(true) => render(&app),
                    Ok(false) => break,
                    Err(err) => println!("Error: {err}"),
                }
            }
        }
    }

    log::info!("Bye");
    Ok(())
}

/// Runs one command line. `Ok(false)` means quit.
async fn handle(
    app: &mut App,
    helper: &QuizHelper,
    tutor: &mut Option<Tutor>,
    line: &str,
) -> Result<bool, QuizError> {
    app.clear_banner();
    let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
    let rest = rest.trim();

    match command {
        "" => {}
        "quit" => return Ok(false),
        "help" => println!("{HELP_TEXT}"),
        "courses" => app.show_course_list().await?,
        "course" => course_command(app, rest).await?,
        "content" => content_command(app, rest).await?,
        "quiz" => {
            let (count, rest) = split_number(rest)?;
            let (model, topic) = split_model(rest, app.settings().default_model);
            app.start_quiz(topic, count.unwrap_or(app.settings().question_count), model)?;
        }
        "answer" => {
            let (number, _) = split_number(rest)?;
            if !app.select_option(number.unwrap_or(0).wrapping_sub(1)) {
                println!("That answer can't be picked now.");
            }
        }
        "hint" => {
            app.toggle_hint();
        }
        "next" => app.next_question().await,
        "chat" => {
            if app.start_chat() {
                if let Some((question, answer)) = app.chat_subject() {
                    let opened = helper.open_tutor(question, answer, app.model())?;
                    println!("Tutor: {}", opened.opening());
                    *tutor = Some(opened);
                }
            } else {
                println!("There is no question to chat about right now.");
            }
        }
        "ask" => match tutor.as_mut() {
            Some(tutor) if app.state() == GameState::ChattingQuestion => {
                println!("Tutor: {}", tutor.ask(rest).await?);
            }
            _ => println!("Start a chat first."),
        },
        "endchat" => {
            *tutor = None;
            app.end_chat().await;
        }
        "save" => {
            app.exit_quiz(false).await?;
        }
        "exit" => {
            app.exit_quiz(true).await?;
        }
        "again" => app.retake_current()?,
        "retake" => app.retake(parse_id(rest)?).await?,
        "attempt" => app.view_attempt(parse_id(rest)?).await?,
        "back" => app.close_attempt(),
        "setup" => app.restart_setup(),
        other => println!("Unknown command {other:?}, try `help`."),
    }
    Ok(true)
}

async fn course_command(app: &mut App, args: &str) -> Result<(), QuizError> {
    let (action, rest) = args.split_once(' ').unwrap_or((args, ""));
    let rest = rest.trim();
    match action {
        "new" => {
            app.create_course(rest).await?;
        }
        "open" => app.select_course(parse_id(rest)?).await?,
        "rename" => {
            let (id, name) = rest.split_once(' ').unwrap_or((rest, ""));
            app.rename_course(parse_id(id)?, name).await?;
        }
        "delete" => app.delete_course(parse_id(rest)?).await?,
        "quiz" => {
            let (count, rest) = split_number(rest)?;
            let (model, _) = split_model(rest, app.settings().default_model);
            app.start_course_quiz(count.unwrap_or(app.settings().question_count), model)
                .await?;
        }
        _ => println!("Usage: course new|open|rename|delete|quiz ..."),
    }
    Ok(())
}

async fn content_command(app: &mut App, args: &str) -> Result<(), QuizError> {
    let (action, rest) = args.split_once(' ').unwrap_or((args, ""));
    let rest = rest.trim();
    match action {
        "add" => {
            let (title, text) = rest.split_once('|').unwrap_or((rest, ""));
            app.add_content(title, text).await?;
        }
        "edit" => {
            let (id, rest) = rest.split_once(' ').unwrap_or((rest, ""));
            let (title, text) = rest.split_once('|').unwrap_or((rest, ""));
            app.update_content(parse_id(id)?, title, text).await?;
        }
        "delete" => app.delete_content(parse_id(rest)?).await?,
        _ => println!("Usage: content add|edit|delete ..."),
    }
    Ok(())
}

fn parse_id(raw: &str) -> Result<i64, QuizError> {
    raw.trim()
        .parse()
        .map_err(|_| QuizError::InvalidInput("expected a numeric id"))
}

/// Splits an optional leading number off `raw`.
fn split_number(raw: &str) -> Result<(Option<usize>, &str), QuizError> {
    let (head, tail) = raw.split_once(' ').unwrap_or((raw, ""));
    if head.is_empty() {
        return Ok((None, tail));
    }
    match head.parse() {
        Ok(number) => Ok((Some(number), tail.trim())),
        Err(_) if head.chars().all(|c| c.is_ascii_digit()) => {
            Err(QuizError::InvalidInput("number is out of range"))
        }
        Err(_) => Ok((None, raw)),
    }
}

/// Splits an optional leading model name off `raw`.
fn split_model(raw: &str, default: Model) -> (Model, &str) {
    let (head, tail) = raw.split_once(' ').unwrap_or((raw, ""));
    match head.parse() {
        Ok(model) => (model, tail.trim()),
        Err(_) => (default, raw),
    }
}

fn render(app: &App) {
    let screen = app.screen();
    println!("\n== {:?} ==", screen.state);
    match &screen.banner {
        Some(Banner::Error(message)) => println!("Error: {message}"),
        Some(Banner::Advisory(message)) => println!("Note: {message}"),
        None => {}
    }
    if !screen.loading_message.is_empty() {
        println!("{}", screen.loading_message);
    }

    match screen.state {
        GameState::CourseList => {
            for course in app.courses() {
                println!("  [{}] {}", course.id, course.name);
            }
        }
        GameState::CourseDetail => {
            if let Some(course) = app.current_course() {
                println!("Course [{}] {}", course.id, course.name);
            }
            for content in app.course_contents() {
                println!("  content [{}] {}", content.id, content.title);
            }
            for attempt in app.course_attempts() {
                println!(
                    "  attempt [{}] quiz {} {}: {}/{} on {}",
                    attempt.id.unwrap_or_default(),
                    attempt.quiz_definition_id,
                    attempt.topic,
                    attempt.score,
                    attempt.total_questions_in_attempt,
                    attempt.attempted_at.format("%Y-%m-%d %H:%M")
                );
            }
        }
        GameState::QuizHistoryDetail => {
            if let Some(attempt) = app.viewing_attempt() {
                println!("{}: {}/{}", attempt.topic, attempt.score, attempt.total_questions_in_attempt);
                for answer in &attempt.answers {
                    let mark = if answer.is_correct { "+" } else { "-" };
                    println!("  {mark} {} -> {}", answer.question_text, answer.selected_answer_text);
                }
                if let Some(summary) = &attempt.ai_summary {
                    println!("\n{summary}");
                }
            }
        }
        GameState::Playing | GameState::ShowAnswer => render_question(app),
        GameState::Results => {
            if let Some(session) = app.session() {
                println!("Score: {}/{}", session.score(), session.answers().len());
                match session.summary() {
                    Some(summary) => println!("\n{summary}"),
                    None => println!("No summary available."),
                }
            }
        }
        _ => {}
    }
}

fn render_question(app: &App) {
    let Some(session) = app.session() else {
        return;
    };
    let Some(question) = session.current_question() else {
        return;
    };
    println!(
        "Question {} of {}: {}",
        session.cursor() + 1,
        session.expected_len(),
        question.text
    );
    for (i, option) in question.answer_options.iter().enumerate() {
        println!("  {}. {}", i + 1, option.text);
    }
    if session.hint_visible() {
        println!("Hint: {}", question.hint);
    }
    if let Some(answer) = session.current_answer() {
        let verdict = if answer.is_correct { "Correct!" } else { "Incorrect." };
        println!("{verdict} {}", answer.rationale);
        if !answer.is_correct {
            println!("The correct answer is: {}", answer.correct_answer_text);
        }
    }
}
