//! In-process fakes shared by unit tests

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::api::{
    Credentials, Event, EventApi, EventFields, ImageUpload, LoginResponse, SignupForm,
};
use crate::error::{ClientError, ClientResult};

pub fn event(id: &str, name: &str, category: &str, date: &str) -> Event {
    Event {
        id: id.to_string(),
        name: name.to_string(),
        date: date.to_string(),
        description: String::new(),
        price: 0.0,
        location: "Hall A".to_string(),
        category: category.to_string(),
        image_url: None,
        attendee_count: 0,
    }
}

/// Scriptable [`EventApi`] that counts the calls it receives
#[derive(Default)]
pub struct FakeApi {
    pub events: Mutex<Vec<Event>>,
    pub enrolled: Mutex<HashSet<String>>,
    pub fail_with: Mutex<Option<fn() -> ClientError>>,
    pub login_role: Mutex<String>,
    pub list_calls: AtomicUsize,
    pub join_calls: AtomicUsize,
    pub withdraw_calls: AtomicUsize,
    pub mutation_calls: AtomicUsize,
    pub login_calls: AtomicUsize,
    pub signup_calls: AtomicUsize,
}

impl FakeApi {
    pub fn with_events(events: Vec<Event>) -> Self {
        let api = Self::default();
        *api.events.lock().unwrap() = events;
        *api.login_role.lock().unwrap() = "member".to_string();
        api
    }

    pub fn fail_next_calls(&self, make: fn() -> ClientError) {
        *self.fail_with.lock().unwrap() = Some(make);
    }

    pub fn recover(&self) {
        *self.fail_with.lock().unwrap() = None;
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    fn check(&self) -> ClientResult<()> {
        match *self.fail_with.lock().unwrap() {
            Some(make) => Err(make()),
            None => Ok(()),
        }
    }

    fn check_token(&self, token: &str) -> ClientResult<()> {
        self.check()?;
        if token == "expired" {
            return Err(ClientError::Auth("Invalid token".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl EventApi for FakeApi {
    async fn list_events(&self) -> ClientResult<Vec<Event>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(self.events.lock().unwrap().clone())
    }

    async fn get_event(&self, id: &str) -> ClientResult<Event> {
        self.check()?;
        self.events
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.id == id)
            .cloned()
            .ok_or_else(|| ClientError::ServerRejection {
                status: 404,
                message: "Event not found".to_string(),
            })
    }

    async fn create_event(
        &self,
        token: &str,
        fields: &EventFields,
        _image: Option<&ImageUpload>,
    ) -> ClientResult<Option<Event>> {
        self.mutation_calls.fetch_add(1, Ordering::SeqCst);
        self.check_token(token)?;
        let mut events = self.events.lock().unwrap();
        let created = Event {
            id: format!("new{}", events.len() + 1),
            name: fields.name.clone(),
            date: fields.date.clone(),
            description: fields.description.clone(),
            price: fields.price,
            location: fields.location.clone(),
            category: fields.category.clone(),
            image_url: None,
            attendee_count: 0,
        };
        events.push(created.clone());
        Ok(Some(created))
    }

    async fn update_event(
        &self,
        token: &str,
        id: &str,
        fields: &EventFields,
        _image: Option<&ImageUpload>,
    ) -> ClientResult<Option<Event>> {
        self.mutation_calls.fetch_add(1, Ordering::SeqCst);
        self.check_token(token)?;
        let mut events = self.events.lock().unwrap();
        let event = events
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| ClientError::ServerRejection {
                status: 404,
                message: "Event not found".to_string(),
            })?;
        event.name = fields.name.clone();
        event.date = fields.date.clone();
        event.category = fields.category.clone();
        Ok(None)
    }

    async fn delete_event(&self, token: &str, id: &str) -> ClientResult<()> {
        self.mutation_calls.fetch_add(1, Ordering::SeqCst);
        self.check_token(token)?;
        let mut events = self.events.lock().unwrap();
        let before = events.len();
        events.retain(|e| e.id != id);
        if events.len() == before {
            return Err(ClientError::ServerRejection {
                status: 404,
                message: "Event not found".to_string(),
            });
        }
        Ok(())
    }

    async fn join_event(&self, token: &str, id: &str) -> ClientResult<()> {
        self.join_calls.fetch_add(1, Ordering::SeqCst);
        self.check_token(token)?;
        self.enrolled.lock().unwrap().insert(id.to_string());
        Ok(())
    }

    async fn withdraw_event(&self, token: &str, id: &str) -> ClientResult<()> {
        self.withdraw_calls.fetch_add(1, Ordering::SeqCst);
        self.check_token(token)?;
        self.enrolled.lock().unwrap().remove(id);
        Ok(())
    }

    async fn enrolled_events(&self, token: &str) -> ClientResult<Vec<String>> {
        self.check_token(token)?;
        let mut ids: Vec<String> = self.enrolled.lock().unwrap().iter().cloned().collect();
        ids.sort();
        Ok(ids)
    }

    async fn login(&self, credentials: &Credentials) -> ClientResult<LoginResponse> {
        self.login_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        if credentials.password != "secret1" {
            return Err(ClientError::ServerRejection {
                status: 401,
                message: "Invalid credentials".to_string(),
            });
        }
        Ok(LoginResponse {
            token: "tok".to_string(),
            user_id: "u1".to_string(),
            user_role: self.login_role.lock().unwrap().clone(),
        })
    }

    async fn signup(&self, form: &SignupForm) -> ClientResult<String> {
        self.signup_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        if form.email == "taken@example.com" {
            return Err(ClientError::ServerRejection {
                status: 400,
                message: "Email already registered".to_string(),
            });
        }
        Ok("User registered successfully".to_string())
    }

    async fn guest_signup(&self, form: &SignupForm) -> ClientResult<String> {
        self.signup(form).await
    }
}
