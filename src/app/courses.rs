use super::*;
use crate::course::combined_context;

impl<S, Q, M> QuizApp<S, Q, M>
where
    S: Store,
    Q: QuestionSource,
    M: Summarizer,
{
    pub async fn load_courses(&mut self) -> Result<&[Course], QuizError> {
        let mut courses = match self.store.list_courses().await {
            Ok(courses) => courses,
            Err(err) => return self.fail(err.into()),
        };
        courses.reverse();
        self.courses = courses;
        Ok(&self.courses)
    }

    pub async fn show_course_list(&mut self) -> Result<(), QuizError> {
        self.reset_quiz();
        self.current_course = None;
        self.course_contents.clear();
        self.course_attempts.clear();
        self.viewing_attempt = None;
        self.load_courses().await?;
        self.nav.go(GameState::CourseList);
        Ok(())
    }

    pub async fn create_course(&mut self, name: &str) -> Result<CourseId, QuizError> {
        let name = name.trim();
        if name.is_empty() {
            return self.fail(QuizError::InvalidInput("course name cannot be empty"));
        }
        let id = match self.store.create_course(name).await {
            Ok(id) => id,
            Err(err) => return self.fail(err.into()),
        };
        log::info!("Created course {id} ({name:?})");
        self.load_courses().await?;
        self.select_course(id).await?;
        Ok(id)
    }

    pub async fn rename_course(&mut self, id: CourseId, name: &str) -> Result<(), QuizError> {
        let name = name.trim();
        if name.is_empty() {
            return self.fail(QuizError::InvalidInput("course name cannot be empty"));
        }
        if let Err(err) = self.store.rename_course(id, name).await {
            return self.fail(err.into());
        }
        if let Some(course) = self.current_course.as_mut().filter(|c| c.id == id) {
            course.name = name.to_string();
        }
        self.load_courses().await?;
        Ok(())
    }

    /// Opens the course page for `id`.
    pub async fn select_course(&mut self, id: CourseId) -> Result<(), QuizError> {
        let course = match self.store.get_course(id).await {
            Ok(Some(course)) => course,
            Ok(None) => return self.fail(StoreError::Missing("course", id).into()),
            Err(err) => return self.fail(err.into()),
        };
        self.current_course = Some(course);
        self.viewing_attempt = None;
        self.load_course_details(id).await?;
        self.nav.go(GameState::CourseDetail);
        Ok(())
    }

    /// Reloads contents (oldest first) and attempts (newest first).
    pub async fn load_course_details(&mut self, id: CourseId) -> Result<(), QuizError> {
        let contents = self.store.list_course_content(id).await;
        let attempts = self.store.list_attempts_for_course(id).await;
        match (contents, attempts) {
            (Ok(contents), Ok(mut attempts)) => {
                attempts.sort_by(|a, b| b.attempted_at.cmp(&a.attempted_at));
                self.course_contents = contents;
                self.course_attempts = attempts;
                Ok(())
            }
            (Err(err), _) | (_, Err(err)) => self.fail(err.into()),
        }
    }

    /// Deletes a course with everything filed under it.
    pub async fn delete_course(&mut self, id: CourseId) -> Result<(), QuizError> {
        let cascade = async {
            self.store.delete_course_contents_for_course(id).await?;
            self.store.delete_attempts_for_course(id).await?;
            self.store.delete_quiz_definitions_for_course(id).await?;
            self.store.delete_course(id).await
        };
        if let Err(err) = cascade.await {
            return self.fail(err.into());
        }
        log::info!("Deleted course {id}");

        if self.current_course.as_ref().map(|c| c.id) == Some(id) {
            self.show_course_list().await
        } else {
            self.load_courses().await.map(|_| ())
        }
    }

    fn selected_course_id(&self) -> Result<CourseId, QuizError> {
        match &self.current_course {
            Some(course) => Ok(course.id),
            None => self.fail(QuizError::NoCourseSelected),
        }
    }

    pub async fn add_content(&mut self, title: &str, text: &str) -> Result<ContentId, QuizError> {
        let course = self.selected_course_id()?;
        let (title, text) = (title.trim(), text.trim());
        if title.is_empty() || text.is_empty() {
            return self.fail(QuizError::InvalidInput("content needs a title and some text"));
        }
        let id = match self.store.add_course_content(course, title, text).await {
            Ok(id) => id,
            Err(err) => return self.fail(err.into()),
        };
        self.load_course_details(course).await?;
        Ok(id)
    }

    pub async fn update_content(&mut self, id: ContentId, title: &str, text: &str) -> Result<(), QuizError> {
        let course = self.selected_course_id()?;
        let (title, text) = (title.trim(), text.trim());
        if title.is_empty() || text.is_empty() {
            return self.fail(QuizError::InvalidInput("content needs a title and some text"));
        }
        if let Err(err) = self.store.update_course_content(id, title, text).await {
            return self.fail(err.into());
        }
        self.load_course_details(course).await
    }

    pub async fn delete_content(&mut self, id: ContentId) -> Result<(), QuizError> {
        let course = self.selected_course_id()?;
        if let Err(err) = self.store.delete_course_content(id).await {
            return self.fail(err.into());
        }
        self.load_course_details(course).await
    }

    pub async fn view_attempt(&mut self, id: AttemptId) -> Result<(), QuizError> {
        let cached = self.course_attempts.iter().find(|a| a.id == Some(id)).cloned();
        let attempt = match cached {
            Some(attempt) => attempt,
            None => match self.store.get_attempt(id).await {
                Ok(Some(attempt)) => attempt,
                Ok(None) => return self.fail(StoreError::Missing("attempt", id).into()),
                Err(err) => return self.fail(err.into()),
            },
        };
        self.viewing_attempt = Some(attempt);
        self.nav.go(GameState::QuizHistoryDetail);
        Ok(())
    }

    pub fn close_attempt(&mut self) {
        self.viewing_attempt = None;
        self.nav.go(GameState::CourseDetail);
    }

    pub async fn delete_attempt(&mut self, id: AttemptId) -> Result<(), QuizError> {
        if let Err(err) = self.store.delete_attempt(id).await {
            return self.fail(err.into());
        }
        if self.viewing_attempt.as_ref().and_then(|a| a.id) == Some(id) {
            self.close_attempt();
        }
        match self.current_course.as_ref().map(|c| c.id) {
            Some(course) => self.load_course_details(course).await,
            None => Ok(()),
        }
    }

    /// Generates a quiz from the selected course's material.
    pub async fn start_course_quiz(&mut self, count: usize, model: Model) -> Result<(), QuizError> {
        let course = match &self.current_course {
            Some(course) => course.clone(),
            None => return self.fail(QuizError::NoCourseSelected),
        };
        self.load_course_details(course.id).await?;
        let context = combined_context(&self.course_contents);
        if context.is_none() {
            log::info!("Course {} has no content, generating from the topic alone", course.id);
        }
        self.begin_generation(course.name, count, model, Some(course.id), context)
    }
}
